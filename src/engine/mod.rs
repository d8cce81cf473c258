//! External engine seams.
//!
//! Recognition, translation and synthesis are collaborators behind narrow
//! traits; the pipeline never depends on a concrete engine. Adapters live in
//! this module, mocks for tests live with the tests.

pub mod recognize;
pub mod registry;
pub mod translate;
pub mod tts;

#[cfg(feature = "whisper")]
pub mod whisper;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No installed language pair covers the requested translation
    #[error("no language pack installed for {from}->{to}")]
    MissingPack { from: String, to: String },

    /// Recognition or translation failed for this call
    #[error("engine call failed: {0}")]
    Failed(String),
}

/// Options forwarded to one recognition call
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    pub word_timestamps: bool,
    pub beam_size: Option<u32>,
    pub temperature: Option<f32>,
}

/// Per-word timing supplied by some recognizers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub probability: f64,
}

/// One timed unit of engine-native recognition output, chunk-relative times
#[derive(Debug, Clone, Default)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub avg_logprob: Option<f64>,
    pub compression_ratio: Option<f64>,
    pub no_speech_prob: Option<f64>,
    pub words: Option<Vec<WordTiming>>,
}

/// Complete output of one recognition call
#[derive(Debug, Clone, Default)]
pub struct Transcription {
    pub segments: Vec<RawSegment>,
    /// Language detected for the whole chunk
    pub language: String,
    /// Chunk-level compression ratio, used as the decode quality signal
    pub compression_ratio: Option<f64>,
}

#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe a mono 16 kHz waveform.
    async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> Result<Transcription, EngineError>;

    fn model_name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate text between two language codes. `Err(MissingPack)` means no
    /// installed pair covers the request; callers degrade to the source text.
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, EngineError>;
}

#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize speech for `text` in `lang`. `None` means the language is
    /// unsupported or synthesis failed; never fatal to the pipeline.
    async fn synthesize(&self, text: &str, lang: &str) -> Option<PathBuf>;
}

pub type SharedRecognizer = Arc<dyn Recognizer>;
pub type SharedTranslator = Arc<dyn Translator>;
pub type SharedSynthesizer = Arc<dyn Synthesizer>;
