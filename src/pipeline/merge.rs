use super::segment::Segment;
use crate::config::MergeConfig;

/// Terminal punctuation, Western and CJK full-width forms.
const TERMINAL_MARKS: [char; 7] = ['.', '?', '!', '…', '。', '？', '！'];

pub fn ends_sentence(text: &str) -> bool {
    text.trim_end()
        .chars()
        .last()
        .map(|c| TERMINAL_MARKS.contains(&c))
        .unwrap_or(false)
}

/// Result of folding a chunk's units together with the carried pending buffer.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Sentence-complete segments, ready for translation and commit
    pub finalized: Vec<Segment>,
    /// Trailing unit that is not yet sentence-complete, carried to the next chunk
    pub pending: Option<Segment>,
}

/// Coalesce adjacent units into sentence-scoped segments.
///
/// Folds left-to-right: a buffer is closed when the gap to the next unit
/// exceeds the merge gap, when its text already ends a sentence, or when its
/// length has reached the force-flush limit; otherwise the unit's text is
/// concatenated (single space) and the end time extended, closing immediately
/// if the concatenation completed a sentence.
pub fn merge_into_sentences(segments: Vec<Segment>, cfg: &MergeConfig) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::new();
    let mut buf: Option<Segment> = None;

    for seg in segments {
        let Some(mut current) = buf.take() else {
            buf = Some(seg);
            continue;
        };

        let gap = seg.start - current.end;
        if gap > cfg.gap_secs
            || ends_sentence(&current.text)
            || current.text.chars().count() >= cfg.force_flush_chars
        {
            merged.push(current);
            buf = Some(seg);
            continue;
        }

        current.text = format!("{} {}", current.text, seg.text).trim().to_string();
        current.end = seg.end;
        if ends_sentence(&current.text) {
            merged.push(current);
        } else {
            buf = Some(current);
        }
    }

    if let Some(current) = buf {
        merged.push(current);
    }

    merged
}

/// Fold the carried pending buffer together with a chunk's normalized units
/// and split the result into finalized segments and the new pending buffer.
///
/// The trailing merged unit is only committed when sentence-complete; an
/// unpunctuated tail becomes the next pending buffer so a mid-sentence
/// utterance is never frozen with a partial translation.
pub fn merge_with_pending(
    pending: Option<Segment>,
    incoming: Vec<Segment>,
    cfg: &MergeConfig,
) -> MergeOutcome {
    let mut combined = Vec::with_capacity(incoming.len() + 1);
    if let Some(pending) = pending {
        combined.push(pending);
    }
    combined.extend(incoming);

    let mut merged = merge_into_sentences(combined, cfg);

    // A tail at the force-flush limit counts as complete; only a short
    // unpunctuated tail is carried over.
    let pending = match merged.last() {
        Some(last)
            if !ends_sentence(&last.text)
                && last.text.chars().count() < cfg.force_flush_chars =>
        {
            merged.pop()
        }
        _ => None,
    };

    MergeOutcome {
        finalized: merged,
        pending,
    }
}
