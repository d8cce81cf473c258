//! HTTP + WebSocket surface: chunk ingestion, session queries, push channel.

pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

pub use routes::create_router;
pub use state::AppState;
