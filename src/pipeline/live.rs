use super::segment::Segment;
use super::translate::{effective_target, resolve_caption, resolve_translation};
use crate::engine::SharedTranslator;
use serde::Serialize;

/// Display-ready projection of the pending utterance.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBundle {
    pub live_text: String,
    pub live_translated: String,
    pub live_caption: String,
}

/// Derive live text/translation/caption from the pending buffer.
///
/// Read-only: the pending segment keeps extending chunk to chunk, so the
/// translation is always performed fresh, and nothing here mutates session
/// state. With no pending segment all fields are empty; callers fall back to
/// the last finalized segment.
pub async fn project_live(
    pending: Option<&Segment>,
    target: &str,
    caption_lang: &str,
    translator: &SharedTranslator,
) -> LiveBundle {
    let Some(pending) = pending else {
        return LiveBundle::default();
    };

    let source = pending.detected_lang.as_str();
    let effective = effective_target(source, target);

    let (live_translated, _) =
        resolve_translation(translator, &pending.text, source, effective).await;
    let (live_caption, _) = resolve_caption(
        translator,
        &pending.text,
        source,
        effective,
        &live_translated,
        caption_lang,
    )
    .await;

    LiveBundle {
        live_text: pending.text.clone(),
        live_translated,
        live_caption,
    }
}
