use super::segment::Segment;
use crate::engine::{EngineError, SharedTranslator};
use futures::stream::{self, StreamExt};
use tracing::warn;

/// Sentinel target meaning "leave text in its detected language".
pub const AUTO_LANG: &str = "auto";

/// The target language, or the segment's own detected language when the
/// requested target is "auto".
pub fn effective_target<'a>(source: &'a str, target: &'a str) -> &'a str {
    if target == AUTO_LANG {
        source
    } else {
        target
    }
}

/// One translation call with the degrade-to-source contract: a missing
/// language pack (or any engine failure) echoes the source text, and only a
/// missing pack raises the flag.
pub async fn resolve_translation(
    translator: &SharedTranslator,
    text: &str,
    source: &str,
    target: &str,
) -> (String, bool) {
    if text.trim().is_empty() {
        return (String::new(), false);
    }
    if source == target {
        return (text.to_string(), false);
    }

    match translator.translate(text, source, target).await {
        Ok(translated) => (translated, false),
        Err(EngineError::MissingPack { from, to }) => {
            warn!("No language pack for {from}->{to}, echoing source text");
            (text.to_string(), true)
        }
        Err(e) => {
            warn!("Translation {source}->{target} failed: {e}");
            (text.to_string(), false)
        }
    }
}

/// Resolve caption text against a possibly distinct display language.
///
/// Reuses the already-computed translation when the caption language equals
/// the effective target; otherwise dispatches an independent call from the
/// source text.
pub async fn resolve_caption(
    translator: &SharedTranslator,
    text: &str,
    source: &str,
    effective: &str,
    translated: &str,
    caption_lang: &str,
) -> (String, bool) {
    if caption_lang == AUTO_LANG || caption_lang == source {
        return (text.to_string(), false);
    }
    if caption_lang == effective {
        return (translated.to_string(), false);
    }
    resolve_translation(translator, text, source, caption_lang).await
}

/// Attach translated and caption text to every newly finalized segment.
///
/// Calls for one chunk are independent and network/process-bound, so they run
/// concurrently up to `worker_cap`, with results written back by index.
/// Returns true when any participating call hit a missing language pack.
pub async fn apply_translations(
    segments: &mut [Segment],
    target: &str,
    caption_lang: &str,
    translator: &SharedTranslator,
    worker_cap: usize,
) -> bool {
    if segments.is_empty() {
        return false;
    }

    let cap = worker_cap.max(1);
    let mut missing_pack = false;

    // Target phase: fill `translated` for every segment
    let mut target_tasks: Vec<(usize, String, String, String)> = Vec::new();
    for (i, seg) in segments.iter_mut().enumerate() {
        let eff = effective_target(&seg.detected_lang, target).to_string();
        if seg.text.trim().is_empty() {
            seg.translated = Some(String::new());
        } else if seg.detected_lang == eff {
            seg.translated = Some(seg.text.clone());
        } else {
            target_tasks.push((i, seg.text.clone(), seg.detected_lang.clone(), eff));
        }
    }

    let results: Vec<(usize, String, bool)> = stream::iter(target_tasks)
        .map(|(i, text, src, dst)| async move {
            let (out, missing) = resolve_translation(translator, &text, &src, &dst).await;
            (i, out, missing)
        })
        .buffer_unordered(cap)
        .collect()
        .await;
    for (i, out, missing) in results {
        segments[i].translated = Some(out);
        missing_pack |= missing;
    }

    // Caption phase: depends on the target phase for reuse
    let mut caption_tasks: Vec<(usize, String, String, String)> = Vec::new();
    for (i, seg) in segments.iter_mut().enumerate() {
        let eff = effective_target(&seg.detected_lang, target);
        if caption_lang == AUTO_LANG || caption_lang == seg.detected_lang {
            seg.caption_text = Some(seg.text.clone());
        } else if caption_lang == eff {
            seg.caption_text = seg.translated.clone().or_else(|| Some(seg.text.clone()));
        } else {
            caption_tasks.push((
                i,
                seg.text.clone(),
                seg.detected_lang.clone(),
                caption_lang.to_string(),
            ));
        }
    }

    let results: Vec<(usize, String, bool)> = stream::iter(caption_tasks)
        .map(|(i, text, src, dst)| async move {
            let (out, missing) = resolve_translation(translator, &text, &src, &dst).await;
            (i, out, missing)
        })
        .buffer_unordered(cap)
        .collect()
        .await;
    for (i, out, missing) in results {
        segments[i].caption_text = Some(out);
        missing_pack |= missing;
    }

    missing_pack
}
