use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::ServerConfig;

use super::game_state::ServerGame;

/// Application state shared between request handlers
pub struct AppState {
    pub games: Mutex<HashMap<String, ServerGame>>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Lock the game table. A handler that panicked mid-update leaves each
    /// game internally consistent, so a poisoned lock is still usable.
    pub fn games(&self) -> MutexGuard<'_, HashMap<String, ServerGame>> {
        self.games.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
