use super::state::SessionState;
use crate::pipeline::segment::Segment;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// One session's lock pair.
///
/// `order` is the per-session serialization point: an ingesting caller holds
/// it for a chunk's entire pipeline so concurrent chunks for the same session
/// are processed in submission order. `state` guards the actual mutations and
/// is held only briefly, never across a recognition or translation call, so
/// a slow engine call cannot pin the state lock.
pub struct SessionCell {
    pub order: Mutex<()>,
    pub state: Mutex<SessionState>,
}

impl SessionCell {
    fn new() -> Self {
        Self {
            order: Mutex::new(()),
            state: Mutex::new(SessionState::new()),
        }
    }
}

/// Process-wide registry of sessions, keyed by opaque identifier.
///
/// Sessions are created lazily on first reference and retained for the
/// process lifetime; there is no eviction. Different sessions share no lock
/// beyond the brief map access here.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionCell>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(&self, id: &str) -> Arc<SessionCell> {
        {
            let sessions = self.sessions.read().await;
            if let Some(cell) = sessions.get(id) {
                return Arc::clone(cell);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Racing creators settle on whichever entry landed first
        Arc::clone(sessions.entry(id.to_string()).or_insert_with(|| {
            info!("Creating session {}", id);
            Arc::new(SessionCell::new())
        }))
    }

    /// Full finalized history for a session. An unseen identifier
    /// materializes an empty session rather than reporting not-found.
    pub async fn segments_snapshot(&self, id: &str) -> Vec<Segment> {
        let cell = self.get_or_create(id).await;
        let state = cell.state.lock().await;
        state.segments.clone()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
