use crate::config::Config;
use crate::pipeline::Engines;
use crate::session::SessionStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub engines: Engines,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, engines: Engines) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            engines,
            config: Arc::new(config),
        }
    }
}
