pub mod audio;
pub mod config;
pub mod engine;
pub mod http;
pub mod pipeline;
pub mod session;

pub use config::Config;
pub use engine::registry::ModelRegistry;
pub use engine::{Recognizer, Synthesizer, Translator};
pub use http::{create_router, AppState};
pub use pipeline::{ChunkParams, ChunkResponse, Engines, Segment};
pub use session::{SessionState, SessionStore};
