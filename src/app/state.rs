//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::GameHandle;
use crate::store::ProgressStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: GameHandle,
    pub progress_store: Arc<ProgressStore>,
}

impl AppState {
    pub fn new(config: Arc<Config>, game: GameHandle, progress_store: Arc<ProgressStore>) -> Self {
        Self {
            config,
            game,
            progress_store,
        }
    }
}
