// Application state module
// Everything a request needs that is fixed at startup

use std::sync::Arc;

use super::types::Config;
use crate::handler::{Handler, SharedHandler};

/// Application state
///
/// Built once in `main` and passed down to every connection. Nothing in here
/// changes after startup, so it is shared without locks.
pub struct AppState {
    pub config: Config,
    pub handler: SharedHandler,
}

impl AppState {
    pub fn new(config: Config, handler: impl Handler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Build state around an already shared handler
    pub fn with_shared(config: Config, handler: SharedHandler) -> Self {
        Self { config, handler }
    }
}
