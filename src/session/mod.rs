//! Per-session mutable state and its process-wide registry.

pub mod broadcast;
pub mod state;
pub mod store;

pub use broadcast::{BroadcastEvent, Subscriber};
pub use state::SessionState;
pub use store::{SessionCell, SessionStore};
