use super::SharedRecognizer;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Builds a recognizer for a model name. Loading may be expensive; the
/// registry only invokes it when the requested model differs from the one
/// currently held.
pub type RecognizerFactory =
    Arc<dyn Fn(&str) -> Result<SharedRecognizer> + Send + Sync>;

/// Process-wide owner of the current recognition model.
///
/// `get` returns the loaded recognizer for a model name. Swapping models is
/// serialized behind the internal mutex: a reload mutates process-wide model
/// identity and must not race with another reload. In-flight transcriptions
/// keep the previous model alive through their own `Arc`.
pub struct ModelRegistry {
    factory: RecognizerFactory,
    current: Mutex<Option<(String, SharedRecognizer)>>,
}

impl ModelRegistry {
    pub fn new(factory: RecognizerFactory) -> Self {
        Self {
            factory,
            current: Mutex::new(None),
        }
    }

    /// Resolve the recognizer for `model`, loading and swapping if needed.
    pub async fn get(&self, model: &str) -> Result<SharedRecognizer> {
        let mut current = self.current.lock().await;

        if let Some((name, recognizer)) = current.as_ref() {
            if name == model {
                return Ok(Arc::clone(recognizer));
            }
            info!("Switching recognition model: {} -> {}", name, model);
        } else {
            info!("Loading recognition model: {}", model);
        }

        let recognizer = (self.factory)(model)?;
        *current = Some((model.to_string(), Arc::clone(&recognizer)));

        Ok(recognizer)
    }

    /// Name of the model currently loaded, if any.
    pub async fn current_model(&self) -> Option<String> {
        self.current.lock().await.as_ref().map(|(name, _)| name.clone())
    }
}
