//! Whisper-backed recognizer.
//!
//! Requires the `whisper` feature and cmake. The server builds and runs
//! without it; ingestion then reports a recognition failure per chunk until a
//! backend is compiled in.

use super::{EngineError, RawSegment, Recognizer, TranscribeOptions, Transcription};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    model_name: String,
}

impl WhisperRecognizer {
    /// Load a ggml model file named `ggml-<model>.bin` under `models_dir`.
    pub fn load(models_dir: &Path, model: &str) -> Result<Self> {
        let model_path: PathBuf = models_dir.join(format!("ggml-{model}.bin"));
        if !model_path.exists() {
            anyhow::bail!("Model file not found: {}", model_path.display());
        }

        let context = WhisperContext::new_with_params(
            model_path
                .to_str()
                .context("Model path is not valid UTF-8")?,
            WhisperContextParameters::default(),
        )
        .context("Failed to load whisper model")?;

        Ok(Self {
            context: Mutex::new(context),
            model_name: model.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Recognizer for WhisperRecognizer {
    async fn transcribe(
        &self,
        samples: &[f32],
        _sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> Result<Transcription, EngineError> {
        let audio = samples.to_vec();
        let opts = opts.clone();

        // whisper.cpp inference is CPU-bound and synchronous
        tokio::task::block_in_place(|| {
            let context = self
                .context
                .lock()
                .map_err(|e| EngineError::Failed(format!("context lock poisoned: {e}")))?;

            let mut state = context
                .create_state()
                .map_err(|e| EngineError::Failed(format!("failed to create state: {e}")))?;

            let strategy = match opts.beam_size {
                Some(beam_size) if beam_size > 1 => SamplingStrategy::BeamSearch {
                    beam_size: beam_size as i32,
                    patience: -1.0,
                },
                _ => SamplingStrategy::Greedy { best_of: 1 },
            };

            let mut params = FullParams::new(strategy);
            params.set_language(None);
            params.set_token_timestamps(opts.word_timestamps);
            if let Some(temperature) = opts.temperature {
                params.set_temperature(temperature);
            }
            params.set_print_special(false);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            state
                .full(params, &audio)
                .map_err(|e| EngineError::Failed(format!("whisper inference failed: {e}")))?;

            let lang_id = state.full_lang_id_from_state();
            let language = whisper_rs::get_lang_str(lang_id).unwrap_or("en").to_string();

            let mut segments = Vec::new();
            for segment in state.as_iter() {
                let text = segment.to_string();
                // Timestamps are in units of 10 ms
                segments.push(RawSegment {
                    start: segment.start_timestamp() as f64 / 100.0,
                    end: segment.end_timestamp() as f64 / 100.0,
                    text,
                    avg_logprob: None,
                    compression_ratio: None,
                    no_speech_prob: Some(segment.no_speech_probability() as f64),
                    words: None,
                });
            }

            Ok(Transcription {
                segments,
                language,
                compression_ratio: None,
            })
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
