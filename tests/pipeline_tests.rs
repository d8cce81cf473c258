// End-to-end chunk processing against scripted engines: gating, merge
// carry-over, translation attachment, session commit, and broadcast.

mod common;

use babelcast::engine::recognize::transcribe_with_fallback;
use babelcast::engine::{EngineError, Recognizer, Transcription};
use babelcast::session::broadcast::BroadcastEvent;
use babelcast::pipeline::process::{
    process_pcm_chunk, process_upload_chunk, ChunkParams, ChunkResponse,
};
use babelcast::{Config, SessionStore};
use common::{engines_with, transcription, ScriptedRecognizer, TaggingTranslator};
use std::sync::Arc;

const SAMPLE_RATE: usize = 16000;

/// One second of audio loud enough to pass any gate state.
fn loud_chunk() -> Vec<f32> {
    vec![0.1; SAMPLE_RATE]
}

/// One second of near-silence, below the fallback threshold.
fn quiet_chunk() -> Vec<f32> {
    vec![0.001; SAMPLE_RATE]
}

#[tokio::test]
async fn silent_chunk_skips_recognition_and_reports_telemetry() -> anyhow::Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![]);
    let engines = engines_with(Arc::clone(&recognizer), TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    let response = process_pcm_chunk(&store, &engines, &cfg, &params, quiet_chunk()).await?;

    assert!(response.silence);
    assert_eq!(response.calibrating, Some(true));
    assert!(response.new_segments.is_empty());
    assert_eq!(response.live_text, "");
    assert!((response.rms.unwrap() - 0.001).abs() < 1e-5);
    assert_eq!(response.threshold, Some(cfg.gate.fallback_threshold));
    // The recognizer was never consulted
    assert!(recognizer.temperatures_seen.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn unpunctuated_chunk_stays_pending_with_live_projection() -> anyhow::Result<()> {
    let recognizer =
        ScriptedRecognizer::new(vec![Ok(transcription("en", &[(0.0, 0.5, "Hello")]))]);
    let translator = TaggingTranslator::new();
    let engines = engines_with(recognizer, Arc::clone(&translator));
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    let response = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;

    assert!(!response.silence);
    assert!(response.new_segments.is_empty());
    assert_eq!(response.live_text, "Hello");
    assert_eq!(response.live_translated, "[es] Hello");
    // Caption language equals the target, so the live caption reuses it
    assert_eq!(response.live_caption, "[es] Hello");
    assert_eq!(translator.call_count(), 1);

    // Nothing was committed to the finalized history
    assert!(store.segments_snapshot("s1").await.is_empty());
    Ok(())
}

#[tokio::test]
async fn pending_merges_with_next_chunk_into_one_sentence() -> anyhow::Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![
        Ok(transcription("en", &[(0.0, 0.5, "Hello")])),
        Ok(transcription("en", &[(0.0, 0.3, "world.")])),
    ]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;
    let response = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;

    assert_eq!(response.new_segments.len(), 1);
    let merged = &response.new_segments[0];
    assert_eq!(merged.text, "Hello world.");
    assert_eq!(merged.start, 0.0);
    // Second chunk's unit was shifted by the first chunk's duration
    assert!((merged.end - 1.3).abs() < 1e-9);
    assert_eq!(merged.translated.as_deref(), Some("[es] Hello world."));

    // With nothing pending, live fields fall back to the finalized sentence
    assert_eq!(response.live_text, "Hello world.");
    assert_eq!(response.live_translated, "[es] Hello world.");

    let history = store.segments_snapshot("s1").await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "Hello world.");
    Ok(())
}

#[tokio::test]
async fn silence_advances_the_session_clock() -> anyhow::Result<()> {
    let recognizer =
        ScriptedRecognizer::new(vec![Ok(transcription("en", &[(0.0, 0.5, "Hi there.")]))]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    process_pcm_chunk(&store, &engines, &cfg, &params, quiet_chunk()).await?;
    let response = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;

    // The silent second still counts toward the session timeline
    assert_eq!(response.new_segments.len(), 1);
    assert!((response.new_segments[0].start - 1.0).abs() < 1e-9);
    assert!((response.new_segments[0].end - 1.5).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn accumulated_duration_is_the_sum_of_all_chunks() -> anyhow::Result<()> {
    let recognizer =
        ScriptedRecognizer::new(vec![Ok(transcription("en", &[(0.0, 0.4, "Middle bit.")]))]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    process_pcm_chunk(&store, &engines, &cfg, &params, quiet_chunk()).await?;
    process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;
    process_pcm_chunk(&store, &engines, &cfg, &params, quiet_chunk()).await?;

    let cell = store.get_or_create("s1").await;
    let state = cell.state.lock().await;
    assert!((state.accumulated_duration - 3.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn calibration_resolves_across_chunks_and_caps_threshold() -> anyhow::Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![
        Ok(Transcription::default()),
        Ok(Transcription::default()),
    ]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    let first = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;
    assert_eq!(first.calibrating, Some(true));
    assert_eq!(first.threshold, Some(cfg.gate.fallback_threshold));

    // Second chunk crosses the 1.5s window; 0.1 * 1.5 is capped at the ceiling
    let second = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;
    assert_eq!(second.calibrating, Some(false));
    assert_eq!(second.threshold, Some(cfg.gate.max_threshold));
    assert!(!second.silence);
    Ok(())
}

#[tokio::test]
async fn recognition_failure_leaves_session_state_untouched() -> anyhow::Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![
        Err(EngineError::Failed("decoder crashed".to_string())),
        Ok(transcription("en", &[(0.0, 0.5, "Recovered.")])),
    ]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let mut params = ChunkParams::for_session("s1");
    params.use_temp_fallback = false; // single decode attempt, no ladder

    let failed = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await;
    assert!(failed.is_err());

    {
        let cell = store.get_or_create("s1").await;
        let state = cell.state.lock().await;
        assert!(state.pending.is_none());
        assert_eq!(state.accumulated_duration, 0.0);
    }

    // The next chunk starts the timeline where the failed one would have
    let response = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;
    assert_eq!(response.new_segments.len(), 1);
    assert_eq!(response.new_segments[0].start, 0.0);
    Ok(())
}

#[tokio::test]
async fn temperature_ladder_retries_degenerate_decode() -> anyhow::Result<()> {
    let mut repetitive = transcription("en", &[(0.0, 0.5, "la la la la")]);
    repetitive.compression_ratio = Some(3.0);

    let recognizer = ScriptedRecognizer::new(vec![
        Ok(repetitive),
        Ok(transcription("en", &[(0.0, 0.5, "Clean decode.")])),
    ]);
    let cfg = Config::default();

    let shared: Arc<dyn Recognizer> = Arc::clone(&recognizer) as Arc<dyn Recognizer>;
    let result =
        transcribe_with_fallback(&shared, &loud_chunk(), 16000, false, None, true, &cfg.recognition)
            .await?;

    assert_eq!(result.segments[0].text, "Clean decode.");
    let temps = recognizer.temperatures_seen.lock().unwrap();
    assert_eq!(*temps, vec![Some(0.0), Some(0.2)]);
    Ok(())
}

#[tokio::test]
async fn missing_pack_is_reported_once_per_chunk() -> anyhow::Result<()> {
    let recognizer =
        ScriptedRecognizer::new(vec![Ok(transcription("en", &[(0.0, 0.5, "Hello.")]))]);
    let translator = TaggingTranslator::with_missing(&[("en", "xx")]);
    let engines = engines_with(recognizer, translator);
    let store = SessionStore::new();
    let cfg = Config::default();
    let mut params = ChunkParams::for_session("s1");
    params.target = "xx".to_string();
    params.caption_lang = "xx".to_string();

    let response = process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;

    assert_eq!(response.missing_language_pack.as_deref(), Some("xx-xx"));
    // Degraded: the source text is echoed rather than dropped
    assert_eq!(response.new_segments[0].translated.as_deref(), Some("Hello."));
    Ok(())
}

#[tokio::test]
async fn broadcast_reaches_live_subscribers_and_drops_dead_ones() -> anyhow::Result<()> {
    let recognizer =
        ScriptedRecognizer::new(vec![Ok(transcription("en", &[(0.0, 0.5, "Hi there.")]))]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    let cell = store.get_or_create("s1").await;
    let (mut alive_rx, dead_rx) = {
        let mut state = cell.state.lock().await;
        let (_, alive_rx) = state.attach_subscriber();
        let (_, dead_rx) = state.attach_subscriber();
        assert_eq!(state.subscriber_count(), 2);
        (alive_rx, dead_rx)
    };
    drop(dead_rx);

    process_pcm_chunk(&store, &engines, &cfg, &params, loud_chunk()).await?;

    match alive_rx.try_recv() {
        Ok(BroadcastEvent::Segments {
            new_segments,
            has_pending,
            ..
        }) => {
            assert_eq!(new_segments.len(), 1);
            assert_eq!(new_segments[0].text, "Hi there.");
            assert!(!has_pending);
        }
        other => panic!("expected a segments event, got {other:?}"),
    }

    // The closed subscriber was pruned during the broadcast
    let state = cell.state.lock().await;
    assert_eq!(state.subscriber_count(), 1);
    Ok(())
}

#[test]
fn degenerate_reply_omits_gate_telemetry() {
    let response = ChunkResponse::degenerate();
    assert!(response.silence);

    // Malformed input never reaches the gate, so no gate state is reported
    let json = serde_json::to_value(&response).unwrap();
    let fields = json.as_object().unwrap();
    assert!(!fields.contains_key("rms"));
    assert!(!fields.contains_key("threshold"));
    assert!(!fields.contains_key("calibrating"));
    assert!(!fields.contains_key("missingLanguagePack"));
}

#[tokio::test]
async fn upload_chunks_bypass_the_gate_and_extend_the_timeline() -> anyhow::Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![
        Ok(transcription("en", &[(0.0, 2.5, "First sentence.")])),
        Ok(transcription("en", &[(0.0, 1.0, "Second one.")])),
    ]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    // All-zero audio would be gated out on the PCM path; uploads are not gated
    let first = process_upload_chunk(&store, &engines, &cfg, &params, vec![0.0; 16000]).await?;
    assert!(!first.silence);
    assert_eq!(first.new_segments.len(), 1);
    assert_eq!(first.new_segments[0].text, "First sentence.");

    {
        let cell = store.get_or_create("s1").await;
        let state = cell.state.lock().await;
        // The clock advances to the last recognized unit's end
        assert!((state.accumulated_duration - 2.5).abs() < 1e-9);
        // The gate never saw the blob
        assert!(state.calibration.is_calibrating());
    }

    // The next blob's units are shifted to continue from the first blob
    let second = process_upload_chunk(&store, &engines, &cfg, &params, vec![0.0; 16000]).await?;
    assert_eq!(second.new_segments.len(), 1);
    assert!((second.new_segments[0].start - 2.5).abs() < 1e-9);
    assert!((second.new_segments[0].end - 3.5).abs() < 1e-9);

    let cell = store.get_or_create("s1").await;
    let state = cell.state.lock().await;
    assert!((state.accumulated_duration - 3.5).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn upload_with_no_recognized_units_leaves_the_clock_alone() -> anyhow::Result<()> {
    let recognizer =
        ScriptedRecognizer::new(vec![Ok(transcription("en", &[(0.0, 2.0, "Something said.")]))]);
    let engines = engines_with(recognizer, TaggingTranslator::new());
    let store = SessionStore::new();
    let cfg = Config::default();
    let params = ChunkParams::for_session("s1");

    process_upload_chunk(&store, &engines, &cfg, &params, vec![0.0; 16000]).await?;

    // The scripted recognizer is exhausted and decodes nothing for this blob
    let empty = process_upload_chunk(&store, &engines, &cfg, &params, vec![0.0; 16000]).await?;
    assert!(empty.new_segments.is_empty());

    let cell = store.get_or_create("s1").await;
    let state = cell.state.lock().await;
    assert!((state.accumulated_duration - 2.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn unseen_session_id_materializes_an_empty_session() -> anyhow::Result<()> {
    let store = SessionStore::new();
    assert_eq!(store.session_count().await, 0);

    let snapshot = store.segments_snapshot("brand-new").await;
    assert!(snapshot.is_empty());
    assert_eq!(store.session_count().await, 1);
    Ok(())
}
