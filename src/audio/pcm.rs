/// Raw PCM boundary: chunks arrive as little-endian f32 samples in [-1, 1].
///
/// A byte count that is not a multiple of 4, or an empty body, is a degenerate
/// chunk ("silence, no new segments"), never a hard failure.
pub fn parse_f32_le(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }

    let samples = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect::<Vec<f32>>();

    if samples.is_empty() {
        None
    } else {
        Some(samples)
    }
}

/// Wall-clock seconds represented by a mono chunk.
pub fn chunk_duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}
