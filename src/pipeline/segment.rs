use crate::engine::{Transcription, WordTiming};
use serde::{Deserialize, Serialize};

/// One unit of recognized speech.
///
/// Times are seconds relative to session start once the accumulated-duration
/// offset has been applied. Translation and caption are attached by the
/// fan-out before a segment is appended to the finalized history; a finalized
/// segment never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub detected_lang: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_logprob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_speech_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTiming>>,

    /// Text in the effective target language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
    /// Text in the caption display language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_text: Option<String>,
}

/// Reshape engine-native recognition output into uniform segment records.
///
/// Empty text is discarded; the chunk-level detected language is attached to
/// every unit; optional confidence and word-timing fields are carried through
/// when the recognizer supplied them. No merging, no translation, and no time
/// offsetting happens here; times stay chunk-relative.
pub fn normalize(transcription: &Transcription) -> Vec<Segment> {
    transcription
        .segments
        .iter()
        .filter_map(|raw| {
            let text = raw.text.trim();
            if text.is_empty() {
                return None;
            }
            Some(Segment {
                start: raw.start,
                end: raw.end,
                text: text.to_string(),
                detected_lang: transcription.language.clone(),
                avg_logprob: raw.avg_logprob,
                compression_ratio: raw.compression_ratio,
                no_speech_prob: raw.no_speech_prob,
                words: raw.words.clone(),
                translated: None,
                caption_text: None,
            })
        })
        .collect()
}

/// Shift chunk-relative timestamps into session time.
pub fn apply_offset(segments: &mut [Segment], offset: f64) {
    for segment in segments {
        segment.start += offset;
        segment.end += offset;
    }
}
