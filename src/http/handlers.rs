use super::state::AppState;
use crate::audio::{decode_blob, parse_f32_le};
use crate::pipeline::process::{process_pcm_chunk, process_upload_chunk};
use crate::pipeline::{ChunkParams, ChunkResponse};
use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(context: &str, e: anyhow::Error) -> axum::response::Response {
    error!("{context}: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{context}: {e}"),
        }),
    )
        .into_response()
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /ingest/pcm
///
/// Ingest raw little-endian f32 PCM in [-1, 1] with adaptive silence gating.
/// Malformed PCM (odd byte count, zero samples) is a degenerate silence
/// response, not an error; an empty body is rejected.
pub async fn ingest_pcm(
    State(state): State<AppState>,
    Query(params): Query<ChunkParams>,
    body: Bytes,
) -> impl IntoResponse {
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "empty PCM data".to_string(),
            }),
        )
            .into_response();
    }

    let Some(samples) = parse_f32_le(&body) else {
        return Json(ChunkResponse::degenerate()).into_response();
    };

    match process_pcm_chunk(&state.store, &state.engines, &state.config, &params, samples).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => internal_error("PCM transcription failed", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub session: String,
    #[serde(default = "default_lang")]
    pub target: String,
    #[serde(default = "default_lang")]
    pub caption_lang: String,
}

fn default_lang() -> String {
    "es".to_string()
}

/// POST /ingest
///
/// Container-file ingestion: the uploaded blob is demuxed/decoded to the
/// canonical waveform (with a WAV alternate path), then run through the same
/// pipeline without silence gating.
pub async fn ingest_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut data: Option<Bytes> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") || data.is_none() {
            match field.bytes().await {
                Ok(bytes) => data = Some(bytes),
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse {
                            error: format!("failed to read upload: {e}"),
                        }),
                    )
                        .into_response();
                }
            }
        }
    }

    let Some(data) = data.filter(|d| !d.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "empty chunk".to_string(),
            }),
        )
            .into_response();
    };

    let samples = match decode_blob(&data) {
        Ok(samples) => samples,
        Err(e) => return internal_error("transcription failed", e),
    };

    let chunk_params = ChunkParams {
        target: params.target,
        caption_lang: params.caption_lang,
        ..ChunkParams::for_session(params.session)
    };

    match process_upload_chunk(
        &state.store,
        &state.engines,
        &state.config,
        &chunk_params,
        samples,
    )
    .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => internal_error("transcription failed", e),
    }
}

/// GET /sessions/:session_id/segments
///
/// Full finalized history; an unseen identifier materializes an empty session.
pub async fn list_segments(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let segments = state.store.segments_snapshot(&session_id).await;
    Json(json!({ "segments": segments }))
}

/// GET /sessions/:session_id/tts/:file_name
pub async fn get_tts_file(
    State(state): State<AppState>,
    Path((_session_id, file_name)): Path<(String, String)>,
) -> impl IntoResponse {
    // Artifact names are flat uuids; anything path-like is rejected
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not found".to_string(),
            }),
        )
            .into_response();
    }

    let path = state.config.tts.output_dir.join(&file_name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not found".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /api/translation/available
pub async fn available_translations(State(state): State<AppState>) -> impl IntoResponse {
    let packs = &state.config.translation.packs;
    Json(json!({
        "available": !packs.is_empty(),
        "packs": packs,
        "count": packs.len(),
    }))
}

/// GET /api/config/models
pub async fn available_models(State(state): State<AppState>) -> impl IntoResponse {
    let recognition = &state.config.recognition;
    let current = state
        .engines
        .registry
        .current_model()
        .await
        .unwrap_or_else(|| recognition.default_model.clone());

    Json(json!({
        "available_models": recognition.available_models,
        "current_model": current,
        "current_beam_size": recognition.beam_size,
        "temperature_sequence": recognition.temperatures,
    }))
}
