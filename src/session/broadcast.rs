use crate::pipeline::segment::Segment;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Buffered events per subscriber before pushes start being dropped
pub const SUBSCRIBER_BUFFER: usize = 32;

/// Payload pushed to session observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum BroadcastEvent {
    /// Greeting sent once on attach
    #[serde(rename_all = "camelCase")]
    Hello { session: String },

    /// Live + newly finalized state after a transcribed chunk
    #[serde(rename_all = "camelCase")]
    Segments {
        live_text: String,
        live_translated: String,
        live_caption: String,
        new_segments: Vec<Segment>,
        has_pending: bool,
    },
}

/// A passive observer attached to a session.
///
/// The session holds only this send handle; the connection itself is owned by
/// the transport layer. A closed channel removes the subscriber on the next
/// broadcast.
#[derive(Debug)]
pub struct Subscriber {
    pub id: Uuid,
    tx: mpsc::Sender<BroadcastEvent>,
}

impl Subscriber {
    pub fn new() -> (Self, mpsc::Receiver<BroadcastEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// Best-effort push; never blocks. `false` means the receiver is gone.
    pub fn push(&self, event: BroadcastEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            // A full buffer drops this event but keeps the subscription;
            // one slow observer must not stall the pipeline
            Err(mpsc::error::TrySendError::Full(_)) => {
                info!("Subscriber {} buffer full, dropping event", self.id);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
