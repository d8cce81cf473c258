use super::Synthesizer;
use crate::config::TtsConfig;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

/// Synthesizer invoking an external piper-style process per segment.
///
/// The voice map decides language support; a language without a voice model
/// (or any process failure) yields `None`, which the pipeline treats as
/// "no audio for this segment" rather than an error.
pub struct PiperSynthesizer {
    config: TtsConfig,
}

impl PiperSynthesizer {
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Synthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str, lang: &str) -> Option<PathBuf> {
        let voice = self.config.voices.get(lang)?;
        if !voice.exists() {
            return None;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.config.output_dir).await {
            warn!("Failed to create TTS output directory: {e}");
            return None;
        }

        let out_path = self
            .config
            .output_dir
            .join(format!("tts_{}.wav", uuid::Uuid::new_v4().simple()));

        let mut child = Command::new(&self.config.command)
            .arg("--model")
            .arg(voice)
            .arg("--output_file")
            .arg(&out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| warn!("Failed to spawn TTS process: {e}"))
            .ok()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await.ok()?;
        }

        let status = child.wait().await.ok()?;
        if status.success() && out_path.exists() {
            Some(out_path)
        } else {
            None
        }
    }
}
