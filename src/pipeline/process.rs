use super::live::{project_live, LiveBundle};
use super::segment::{self, Segment};
use super::{merge, translate};
use crate::audio::{gate, pcm};
use crate::config::Config;
use crate::engine::registry::ModelRegistry;
use crate::engine::{recognize, SharedSynthesizer, SharedTranslator};
use crate::session::broadcast::BroadcastEvent;
use crate::session::store::{SessionCell, SessionStore};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// External engine handles shared by all sessions.
#[derive(Clone)]
pub struct Engines {
    pub registry: Arc<ModelRegistry>,
    pub translator: SharedTranslator,
    pub synthesizer: SharedSynthesizer,
}

/// Per-chunk ingestion parameters, deserialized straight from the query string.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkParams {
    pub session: String,
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

impl ChunkParams {
    pub fn for_session(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            target: default_lang(),
            caption_lang: default_lang(),
            sample_rate: default_sample_rate(),
            word_timestamps: false,
            beam_size: None,
            use_temp_fallback: true,
            model: None,
        }
    }
}

/// Per-chunk response: live projection, newly finalized segments, synthesis
/// references, gating telemetry.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse {
    pub silence: bool,
    pub live_text: String,
    pub live_translated: String,
    pub live_caption: String,
    pub new_segments: Vec<Segment>,
    pub tts_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_language_pack: Option<String>,
    /// Gate telemetry; absent on replies that never consulted the gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibrating: Option<bool>,
}

impl ChunkResponse {
    /// Response for malformed input: byte count not a multiple of four, or
    /// zero samples. Degraded success, never a hard failure. Gate telemetry
    /// is omitted because the chunk never reached the gate.
    pub fn degenerate() -> Self {
        Self {
            silence: true,
            ..Self::default()
        }
    }
}

/// Run one raw PCM chunk through the full pipeline: gate, recognize, merge,
/// translate, project, commit, synthesize, broadcast.
pub async fn process_pcm_chunk(
    store: &SessionStore,
    engines: &Engines,
    cfg: &Config,
    params: &ChunkParams,
    samples: Vec<f32>,
) -> Result<ChunkResponse> {
    let cell = store.get_or_create(&params.session).await;
    // Held for the whole chunk: chunks for one session are processed in
    // submission order, or the duration offset and pending buffer corrupt
    let _order = cell.order.lock().await;

    let chunk_secs = pcm::chunk_duration_secs(samples.len(), params.sample_rate);
    let energy = gate::rms(&samples);

    let (threshold, calibrating, offset, silent, pending_snapshot) = {
        let mut state = cell.state.lock().await;
        state.calibration.observe(energy, chunk_secs, &cfg.gate);
        let threshold = state.calibration.threshold(&cfg.gate);
        let calibrating = state.calibration.is_calibrating();
        let offset = state.accumulated_duration;
        let silent = gate::is_silence(energy, &state.calibration, &cfg.gate);
        if silent {
            // Silence is real elapsed time even though it skips recognition
            state.accumulated_duration = offset + chunk_secs;
        }
        (threshold, calibrating, offset, silent, state.pending.clone())
    };

    if silent {
        let live = project_live(
            pending_snapshot.as_ref(),
            &params.target,
            &params.caption_lang,
            &engines.translator,
        )
        .await;
        return Ok(ChunkResponse {
            silence: true,
            live_text: live.live_text,
            live_translated: live.live_translated,
            live_caption: live.live_caption,
            rms: Some(energy),
            threshold: Some(threshold),
            calibrating: Some(calibrating),
            ..ChunkResponse::default()
        });
    }

    // Recognition runs without any session lock but under the order guard;
    // a failure here leaves pending buffer and accumulated duration untouched
    // so the next chunk can recover
    let model = params
        .model
        .as_deref()
        .unwrap_or(&cfg.recognition.default_model);
    let recognizer = engines.registry.get(model).await?;
    let transcription = recognize::transcribe_with_fallback(
        &recognizer,
        &samples,
        params.sample_rate,
        params.word_timestamps,
        params.beam_size,
        params.use_temp_fallback,
        &cfg.recognition,
    )
    .await
    .map_err(|e| anyhow!("transcription failed: {e}"))?;

    let mut raw = segment::normalize(&transcription);
    segment::apply_offset(&mut raw, offset);

    info!(
        "Session {}: chunk transcribed, lang={}, units={}",
        params.session,
        transcription.language,
        raw.len()
    );

    finish_chunk(&cell, engines, cfg, params, raw, offset + chunk_secs)
        .await
        .map(|mut response| {
            response.rms = Some(energy);
            response.threshold = Some(threshold);
            response.calibrating = Some(calibrating);
            response
        })
}

/// Run an already-decoded uploaded chunk through the pipeline. No silence
/// gating; accumulated duration advances to the last recognized unit's end.
pub async fn process_upload_chunk(
    store: &SessionStore,
    engines: &Engines,
    cfg: &Config,
    params: &ChunkParams,
    samples: Vec<f32>,
) -> Result<ChunkResponse> {
    let cell = store.get_or_create(&params.session).await;
    let _order = cell.order.lock().await;

    let offset = {
        let state = cell.state.lock().await;
        state.accumulated_duration
    };

    let model = params
        .model
        .as_deref()
        .unwrap_or(&cfg.recognition.default_model);
    let recognizer = engines.registry.get(model).await?;
    let transcription = recognize::transcribe_with_fallback(
        &recognizer,
        &samples,
        crate::audio::TARGET_SAMPLE_RATE,
        params.word_timestamps,
        params.beam_size,
        params.use_temp_fallback,
        &cfg.recognition,
    )
    .await
    .map_err(|e| anyhow!("transcription failed: {e}"))?;

    let mut raw = segment::normalize(&transcription);
    segment::apply_offset(&mut raw, offset);
    let new_duration = raw.last().map(|s| s.end).unwrap_or(offset);

    let (threshold, calibrating) = {
        let state = cell.state.lock().await;
        (
            state.calibration.threshold(&cfg.gate),
            state.calibration.is_calibrating(),
        )
    };

    finish_chunk(&cell, engines, cfg, params, raw, new_duration)
        .await
        .map(|mut response| {
            response.threshold = Some(threshold);
            response.calibrating = Some(calibrating);
            response
        })
}

/// Shared tail of both ingestion paths, entered with offset-shifted units.
/// Caller must hold the session's order lock.
async fn finish_chunk(
    cell: &Arc<SessionCell>,
    engines: &Engines,
    cfg: &Config,
    params: &ChunkParams,
    raw: Vec<Segment>,
    new_duration: f64,
) -> Result<ChunkResponse> {
    let carried = {
        let mut state = cell.state.lock().await;
        state.pending.take()
    };

    let outcome = merge::merge_with_pending(carried, raw, &cfg.merge);
    let mut finalized = outcome.finalized;

    let missing_pack = translate::apply_translations(
        &mut finalized,
        &params.target,
        &params.caption_lang,
        &engines.translator,
        cfg.translation.worker_cap,
    )
    .await;

    let live = project_live(
        outcome.pending.as_ref(),
        &params.target,
        &params.caption_lang,
        &engines.translator,
    )
    .await;

    // Commit: append-only history, single pending buffer, monotonic duration
    {
        let mut state = cell.state.lock().await;
        state.segments.extend(finalized.iter().cloned());
        state.pending = outcome.pending;
        state.accumulated_duration = state.accumulated_duration.max(new_duration);
    }

    let tts_urls = synthesize_finalized(engines, &finalized, params).await;

    let (live_text, live_translated, live_caption) =
        assemble_live_fields(&live, finalized.last());

    let missing_language_pack = if missing_pack && !finalized.is_empty() {
        Some(format!("{}-{}", params.target, params.caption_lang))
    } else {
        None
    };

    {
        let mut state = cell.state.lock().await;
        let has_pending = state.pending.is_some();
        state.broadcast(&BroadcastEvent::Segments {
            live_text: live_text.clone(),
            live_translated: live_translated.clone(),
            live_caption: live_caption.clone(),
            new_segments: finalized.clone(),
            has_pending,
        });
    }

    Ok(ChunkResponse {
        silence: false,
        live_text,
        live_translated,
        live_caption,
        new_segments: finalized,
        tts_urls,
        missing_language_pack,
        ..ChunkResponse::default()
    })
}

/// Live fields fall back to the last finalized segment when nothing is pending.
fn assemble_live_fields(
    live: &LiveBundle,
    last_finalized: Option<&Segment>,
) -> (String, String, String) {
    if !live.live_text.is_empty() {
        return (
            live.live_text.clone(),
            live.live_translated.clone(),
            live.live_caption.clone(),
        );
    }
    match last_finalized {
        Some(last) => {
            let translated = last.translated.clone().unwrap_or_default();
            let caption = last
                .caption_text
                .clone()
                .unwrap_or_else(|| translated.clone());
            (last.text.clone(), translated, caption)
        }
        None => (String::new(), String::new(), String::new()),
    }
}

/// Synthesize audio for each finalized segment's translated text. Failures
/// yield no reference for that segment and never block transcript delivery.
async fn synthesize_finalized(
    engines: &Engines,
    finalized: &[Segment],
    params: &ChunkParams,
) -> Vec<String> {
    let mut urls = Vec::new();
    for segment in finalized {
        let Some(text) = segment.translated.as_deref() else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        if let Some(path) = engines.synthesizer.synthesize(text, &params.target).await {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                urls.push(format!("/sessions/{}/tts/{}", params.session, name));
            }
        }
    }
    urls
}
