//! Controller module - Maps prompt input onto store actions
//!
//! - `input`: Text command parsing
//! - `playback`: Action handling (commands, volume, views)
//! - `state_events`: Prints pushed state changes as they arrive

mod input;
mod playback;
mod state_events;

pub use input::{parse_line, Action};
pub use state_events::spawn_state_printer;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::connection::ConnectionManager;
use crate::model::{CommandObserver, CommandOutcome, LocalPreferenceStore, StateStore};

pub struct AppController<A, C> {
    pub(crate) store: Arc<StateStore<A>>,
    pub(crate) connection: ConnectionManager<C>,
    preferences: Arc<Mutex<LocalPreferenceStore>>,
}

impl<A, C> Clone for AppController<A, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            connection: self.connection.clone(),
            preferences: self.preferences.clone(),
        }
    }
}

impl<A, C> AppController<A, C> {
    pub fn new(
        store: Arc<StateStore<A>>,
        connection: ConnectionManager<C>,
        preferences: LocalPreferenceStore,
    ) -> Self {
        Self {
            store,
            connection,
            preferences: Arc::new(Mutex::new(preferences)),
        }
    }

    pub(crate) fn preferences(&self) -> MutexGuard<'_, LocalPreferenceStore> {
        self.preferences.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn volume(&self) -> f32 {
        self.preferences().volume()
    }
}

/// Reports failed commands at the prompt; the state itself never changes here
pub struct PromptObserver;

impl CommandObserver for PromptObserver {
    fn on_outcome(&self, outcome: &CommandOutcome) {
        if let Err(e) = &outcome.result {
            if outcome.attempts > 1 {
                println!(
                    "! {} failed after {} attempts: {}",
                    outcome.route,
                    outcome.attempts,
                    format_error(e)
                );
            } else {
                println!("! {} failed: {}", outcome.route, format_error(e));
            }
        }
    }
}

pub(crate) fn format_error(error: &crate::error::ApiError) -> String {
    use crate::error::ApiError;

    match error {
        ApiError::Status { status: 401 | 403, .. } => {
            "Not authorized. The token may have expired.".to_string()
        }
        ApiError::Status { status: 404, .. } => "Not found on the server.".to_string(),
        ApiError::Status { status: 429, .. } => "Rate limited. Please wait a moment.".to_string(),
        ApiError::Http(e) if e.is_timeout() => "The server did not answer in time.".to_string(),
        ApiError::Http(e) if e.is_connect() => "Could not reach the server.".to_string(),
        other => format!("Error: {}", other),
    }
}
