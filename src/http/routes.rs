use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .service
        .http
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Ingestion
        .route("/ingest/pcm", post(handlers::ingest_pcm))
        .route("/ingest", post(handlers::ingest_upload))
        .route("/ws/pcm", get(ws::ws_ingest_pcm))
        // Session push channel + queries
        .route("/ws/:session_id", get(ws::ws_subscribe))
        .route("/sessions/:session_id/segments", get(handlers::list_segments))
        .route(
            "/sessions/:session_id/tts/:file_name",
            get(handlers::get_tts_file),
        )
        // Capability listings
        .route(
            "/api/translation/available",
            get(handlers::available_translations),
        )
        .route("/api/config/models", get(handlers::available_models))
        // Request logging
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
