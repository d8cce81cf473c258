use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gate: GateConfig,
    pub merge: MergeConfig,
    pub recognition: RecognitionConfig,
    pub translation: TranslationConfig,
    pub tts: TtsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "babelcast".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Origins allowed by the CORS layer (browser clients post PCM directly)
    pub allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Adaptive silence gating parameters
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Seconds of audio collected before the noise baseline is resolved
    pub calibration_window_secs: f64,
    /// Adaptive threshold = baseline RMS * multiplier, capped below
    pub silence_multiplier: f32,
    /// Ceiling on the adaptive threshold, so a loud calibration window
    /// cannot gate real speech out
    pub max_threshold: f32,
    /// Static threshold used while calibration is still accumulating
    pub fallback_threshold: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            calibration_window_secs: 1.5,
            silence_multiplier: 1.5,
            max_threshold: 0.05,
            fallback_threshold: 0.007,
        }
    }
}

/// Sentence merging parameters
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Gap between segments (seconds) beyond which the buffer is flushed
    pub gap_secs: f64,
    /// Buffered text length that forces a flush even mid-sentence
    pub force_flush_chars: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            gap_secs: 0.6,
            force_flush_chars: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Model used when a request does not name one
    pub default_model: String,
    /// Model names accepted by the registry
    pub available_models: Vec<String>,
    /// Directory holding model files (whisper backend)
    pub models_dir: PathBuf,
    pub beam_size: u32,
    /// Ordered temperature ladder for decode retries
    pub temperatures: Vec<f32>,
    /// Accept a decode when its compression ratio is below this
    pub max_compression_ratio: f64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            default_model: "small".to_string(),
            available_models: [
                "tiny", "tiny.en", "base", "base.en", "small", "small.en", "medium", "medium.en",
                "large-v1", "large-v2", "large-v3",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            models_dir: PathBuf::from("models"),
            beam_size: 5,
            temperatures: vec![0.0, 0.2],
            max_compression_ratio: 2.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// External translator command, given --from-lang/--to-lang and text on stdin
    pub command: String,
    /// Concurrent translation calls per chunk
    pub worker_cap: usize,
    /// Installed language pairs, reported by /api/translation/available
    pub packs: Vec<LanguagePair>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            command: "argos-translate".to_string(),
            worker_cap: 4,
            packs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LanguagePair {
    pub from_code: String,
    pub to_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// External synthesis command (piper-style: --model voice --output_file path)
    pub command: String,
    /// Where synthesized WAV artifacts are written
    pub output_dir: PathBuf,
    /// Language code -> voice model path
    pub voices: HashMap<String, PathBuf>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            command: "piper".to_string(),
            output_dir: PathBuf::from("tts"),
            voices: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus BABELCAST__ env overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("BABELCAST").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
