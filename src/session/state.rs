use super::broadcast::{BroadcastEvent, Subscriber};
use crate::audio::gate::CalibrationState;
use crate::pipeline::segment::Segment;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Mutable state of one streaming session.
///
/// Invariants: at most one pending segment; the finalized history is
/// append-only with monotonically increasing timestamps; accumulated duration
/// never decreases.
#[derive(Debug)]
pub struct SessionState {
    /// Finalized segments in chronological order
    pub segments: Vec<Segment>,
    /// The not-yet-sentence-complete tail carried across chunks
    pub pending: Option<Segment>,
    /// Total audio seconds ingested, silent chunks included
    pub accumulated_duration: f64,
    pub calibration: CalibrationState,
    subscribers: Vec<Subscriber>,
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            pending: None,
            accumulated_duration: 0.0,
            calibration: CalibrationState::default(),
            subscribers: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a passive observer; the returned receiver is owned by the
    /// transport layer.
    pub fn attach_subscriber(&mut self) -> (Uuid, mpsc::Receiver<BroadcastEvent>) {
        let (subscriber, rx) = Subscriber::new();
        let id = subscriber.id;
        self.subscribers.push(subscriber);
        info!("Subscriber {} attached ({} active)", id, self.subscribers.len());
        (id, rx)
    }

    pub fn detach_subscriber(&mut self, id: Uuid) {
        self.subscribers.retain(|s| s.id != id);
        info!("Subscriber {} detached ({} active)", id, self.subscribers.len());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Push an event to every attached subscriber; dead subscribers are
    /// removed, which is local cleanup rather than an error.
    pub fn broadcast(&mut self, event: &BroadcastEvent) {
        self.subscribers.retain(|s| s.push(event.clone()));
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
