pub mod decode;
pub mod gate;
pub mod pcm;

pub use decode::{decode_blob, TARGET_SAMPLE_RATE};
pub use gate::{is_silence, rms, CalibrationState};
pub use pcm::{chunk_duration_secs, parse_f32_le};
