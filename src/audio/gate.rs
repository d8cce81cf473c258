use crate::config::GateConfig;
use tracing::info;

/// Root-mean-square energy of a mono chunk. Empty input is 0.0, never an error.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Per-session adaptive noise estimate.
///
/// Accumulates one RMS sample per chunk until the collected chunks cover the
/// calibration window, then resolves a baseline and an adaptive threshold.
/// Once resolved, the sample list is dropped and the scalars never change.
#[derive(Debug, Clone, Default)]
pub struct CalibrationState {
    samples: Vec<f32>,
    collected_secs: f64,
    baseline: Option<f32>,
    threshold: Option<f32>,
}

impl CalibrationState {
    /// Feed one chunk's RMS into calibration. Returns true when this call
    /// resolved the baseline.
    pub fn observe(&mut self, rms: f32, chunk_secs: f64, cfg: &GateConfig) -> bool {
        if self.baseline.is_some() {
            return false;
        }

        self.samples.push(rms);
        self.collected_secs += chunk_secs;

        if self.collected_secs < cfg.calibration_window_secs {
            return false;
        }

        let baseline = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
        let raw_threshold = baseline * cfg.silence_multiplier;
        let threshold = raw_threshold.min(cfg.max_threshold);

        info!(
            "Silence calibration resolved: baseline_rms={:.4}, raw_threshold={:.4}, capped_threshold={:.4}",
            baseline, raw_threshold, threshold
        );

        self.baseline = Some(baseline);
        self.threshold = Some(threshold);
        // Only the scalars are needed from here on
        self.samples = Vec::new();

        true
    }

    /// Effective silence threshold: adaptive once resolved, static fallback before.
    pub fn threshold(&self, cfg: &GateConfig) -> f32 {
        self.threshold.unwrap_or(cfg.fallback_threshold)
    }

    pub fn is_calibrating(&self) -> bool {
        self.baseline.is_none()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    #[cfg(test)]
    pub(crate) fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Gating decision for one chunk: silence iff RMS is below the effective threshold.
pub fn is_silence(rms: f32, calibration: &CalibrationState, cfg: &GateConfig) -> bool {
    rms < calibration.threshold(cfg)
}
