use super::{EngineError, Translator};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

/// Translator backed by an external command (argos-translate style CLI).
///
/// The command is invoked as `<command> --from-lang <src> --to-lang <tgt>`
/// with the text on stdin and the translation expected on stdout. A missing
/// language pair is recognized from the process output rather than treated as
/// a generic failure, so callers can surface a "pack needed" warning.
pub struct CommandTranslator {
    command: String,
}

const MISSING_PACK_MARKERS: &[&str] = &["no translation", "not found", "not available", "not installed"];

impl CommandTranslator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait::async_trait]
impl Translator for CommandTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, EngineError> {
        let mut child = Command::new(&self.command)
            .args(["--from-lang", source, "--to-lang", target])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Failed(format!("failed to spawn translator: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| EngineError::Failed(format!("failed to write translator stdin: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EngineError::Failed(format!("translator did not exit: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        let missing_pack = MISSING_PACK_MARKERS.iter().any(|m| stderr.contains(m));

        if missing_pack {
            return Err(EngineError::MissingPack {
                from: source.to_string(),
                to: target.to_string(),
            });
        }

        if !output.status.success() {
            warn!(
                "Translator exited with {} for {}->{}",
                output.status, source, target
            );
            return Err(EngineError::Failed(format!(
                "translator exited with {}",
                output.status
            )));
        }

        let translated = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if translated.is_empty() {
            // An installed pair always produces output; silence means no pair
            return Err(EngineError::MissingPack {
                from: source.to_string(),
                to: target.to_string(),
            });
        }

        Ok(translated)
    }
}
