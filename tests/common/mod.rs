// Scripted engine doubles for pipeline tests. The real engines are external
// processes; tests only exercise the pipeline's contracts with them.

use babelcast::engine::registry::ModelRegistry;
use babelcast::engine::{
    EngineError, RawSegment, Recognizer, SharedRecognizer, Synthesizer, TranscribeOptions,
    Transcription, Translator,
};
use babelcast::Engines;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Recognizer that replays a scripted sequence of results.
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<Transcription, EngineError>>>,
    pub temperatures_seen: Mutex<Vec<Option<f32>>>,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Result<Transcription, EngineError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            temperatures_seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn transcribe(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
        opts: &TranscribeOptions,
    ) -> Result<Transcription, EngineError> {
        self.temperatures_seen.lock().unwrap().push(opts.temperature);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Transcription::default()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Build a transcription with the given detected language and timed units.
pub fn transcription(lang: &str, units: &[(f64, f64, &str)]) -> Transcription {
    Transcription {
        segments: units
            .iter()
            .map(|&(start, end, text)| RawSegment {
                start,
                end,
                text: text.to_string(),
                ..RawSegment::default()
            })
            .collect(),
        language: lang.to_string(),
        compression_ratio: None,
    }
}

/// Translator that tags output with the target language and records calls.
#[derive(Default)]
pub struct TaggingTranslator {
    pub calls: Mutex<Vec<(String, String, String)>>,
    pub missing_pairs: HashSet<(String, String)>,
}

impl TaggingTranslator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_missing(pairs: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            missing_pairs: pairs
                .iter()
                .map(|&(f, t)| (f.to_string(), t.to_string()))
                .collect(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Translator for TaggingTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), source.to_string(), target.to_string()));

        if self
            .missing_pairs
            .contains(&(source.to_string(), target.to_string()))
        {
            return Err(EngineError::MissingPack {
                from: source.to_string(),
                to: target.to_string(),
            });
        }

        Ok(format!("[{target}] {text}"))
    }
}

/// Synthesizer that never produces audio.
pub struct NullSynthesizer;

#[async_trait::async_trait]
impl Synthesizer for NullSynthesizer {
    async fn synthesize(&self, _text: &str, _lang: &str) -> Option<PathBuf> {
        None
    }
}

/// Engines wired to the given doubles; the registry hands out the scripted
/// recognizer for any model name.
pub fn engines_with(
    recognizer: Arc<ScriptedRecognizer>,
    translator: Arc<TaggingTranslator>,
) -> Engines {
    let recognizer: SharedRecognizer = recognizer;
    let factory = Arc::new(move |_model: &str| Ok(Arc::clone(&recognizer)));
    Engines {
        registry: Arc::new(ModelRegistry::new(factory)),
        translator,
        synthesizer: Arc::new(NullSynthesizer),
    }
}
