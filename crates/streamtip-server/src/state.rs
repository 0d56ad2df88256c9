use std::sync::Arc;

use crate::config::ServerConfig;
use crate::facilitator::Facilitator;

/// Shared by every worker; built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub facilitator: Arc<dyn Facilitator>,
}

impl AppState {
    pub fn new(config: ServerConfig, facilitator: Arc<dyn Facilitator>) -> Self {
        Self {
            config,
            facilitator,
        }
    }
}
