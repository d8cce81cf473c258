use super::state::AppState;
use crate::audio::parse_f32_le;
use crate::pipeline::process::process_pcm_chunk;
use crate::pipeline::{ChunkParams, ChunkResponse};
use crate::session::BroadcastEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// GET /ws/:session_id, the session-scoped push channel for passive observers.
pub async fn ws_subscribe(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| subscriber_loop(state, session_id, socket))
}

async fn subscriber_loop(state: AppState, session_id: String, socket: WebSocket) {
    let cell = state.store.get_or_create(&session_id).await;
    let (subscriber_id, mut events) = {
        let mut session = cell.state.lock().await;
        session.attach_subscriber()
    };

    let (mut sender, mut receiver) = socket.split();

    let hello = BroadcastEvent::Hello {
        session: session_id.clone(),
    };
    if let Ok(payload) = serde_json::to_string(&hello) {
        let _ = sender.send(Message::Text(payload)).await;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Ok(payload) = serde_json::to_string(&event) else { continue };
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Observers are read-only; anything else is ignored
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    {
        let mut session = cell.state.lock().await;
        session.detach_subscriber(subscriber_id);
    }
    info!("Subscriber channel closed for session {}", session_id);
}

/// Query parameters for the streaming PCM endpoint; the session id is
/// generated when absent.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default = "default_lang")]
    pub target: String,
    #[serde(default = "default_lang")]
    pub caption_lang: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub word_timestamps: bool,
    #[serde(default)]
    pub beam_size: Option<u32>,
    #[serde(default = "default_true")]
    pub use_temp_fallback: bool,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_lang() -> String {
    "es".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_true() -> bool {
    true
}

impl StreamParams {
    fn into_chunk_params(self) -> ChunkParams {
        ChunkParams {
            session: self
                .session
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            target: self.target,
            caption_lang: self.caption_lang,
            sample_rate: self.sample_rate,
            word_timestamps: self.word_timestamps,
            beam_size: self.beam_size,
            use_temp_fallback: self.use_temp_fallback,
            model: self.model,
        }
    }
}

/// GET /ws/pcm: streaming ingestion of binary PCM frames, one response per
/// chunk, with the same semantics as POST /ingest/pcm.
pub async fn ws_ingest_pcm(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    let params = params.into_chunk_params();
    upgrade.on_upgrade(move |socket| ingest_loop(state, params, socket))
}

async fn ingest_loop(state: AppState, params: ChunkParams, mut socket: WebSocket) {
    info!(
        "PCM stream started: session={}, target={}, sample_rate={}",
        params.session, params.target, params.sample_rate
    );

    while let Some(incoming) = socket.recv().await {
        let message = match incoming {
            Ok(message) => message,
            Err(_) => break,
        };

        match message {
            Message::Binary(data) => {
                if data.is_empty() {
                    continue;
                }

                let Some(samples) = parse_f32_le(&data) else {
                    let degenerate = serde_json::to_string(&ChunkResponse::degenerate())
                        .unwrap_or_default();
                    if socket.send(Message::Text(degenerate)).await.is_err() {
                        break;
                    }
                    continue;
                };

                let reply = match process_pcm_chunk(
                    &state.store,
                    &state.engines,
                    &state.config,
                    &params,
                    samples,
                )
                .await
                {
                    Ok(response) => serde_json::to_string(&response).unwrap_or_default(),
                    Err(e) => {
                        warn!("Stream chunk failed for session {}: {e:#}", params.session);
                        json!({ "error": format!("transcription failed: {e}") }).to_string()
                    }
                };

                if socket.send(Message::Text(reply)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Text(text) => {
                warn!("Unexpected text frame on PCM stream: {text}");
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Disconnect stops ingestion; finalized history and accumulated duration
    // stay queryable for this session
    info!("PCM stream disconnected: session={}", params.session);
}
