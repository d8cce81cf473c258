use super::{EngineError, Recognizer, TranscribeOptions, Transcription};
use crate::config::RecognitionConfig;
use std::sync::Arc;
use tracing::info;

/// Transcribe with the ordered temperature ladder.
///
/// Each temperature is tried in turn; the first decode that produced segments
/// and whose compression ratio is below the configured ceiling is accepted.
/// If no attempt qualifies, the last attempt's output is surfaced so a
/// marginal decode still reaches the caller.
pub async fn transcribe_with_fallback(
    recognizer: &Arc<dyn Recognizer>,
    samples: &[f32],
    sample_rate: u32,
    word_timestamps: bool,
    beam_size: Option<u32>,
    use_temp_fallback: bool,
    cfg: &RecognitionConfig,
) -> Result<Transcription, EngineError> {
    let base = TranscribeOptions {
        word_timestamps,
        beam_size: Some(beam_size.unwrap_or(cfg.beam_size)),
        temperature: None,
    };

    if !use_temp_fallback || cfg.temperatures.is_empty() {
        return recognizer.transcribe(samples, sample_rate, &base).await;
    }

    let mut last: Option<Result<Transcription, EngineError>> = None;

    for &temperature in &cfg.temperatures {
        let opts = TranscribeOptions {
            temperature: Some(temperature),
            ..base.clone()
        };

        match recognizer.transcribe(samples, sample_rate, &opts).await {
            Ok(result) => {
                let compression = result.compression_ratio.unwrap_or(1.0);
                if !result.segments.is_empty() && compression < cfg.max_compression_ratio {
                    info!(
                        "Accepted decode at temperature={}, compression_ratio={:.2}",
                        temperature, compression
                    );
                    return Ok(result);
                }
                info!(
                    "Decode at temperature={} low quality (segments={}, compression_ratio={:.2}), trying next",
                    temperature,
                    result.segments.len(),
                    compression
                );
                last = Some(Ok(result));
            }
            Err(e) => {
                info!("Decode at temperature={} failed: {e}", temperature);
                last = Some(Err(e));
            }
        }
    }

    last.unwrap_or_else(|| Err(EngineError::Failed("no decode attempts ran".to_string())))
}
