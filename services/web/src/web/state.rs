//! services/web/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::SessionConfig;
use listings_core::ports::{AccountStore, SessionStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub session: Arc<SessionConfig>,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountStore>,
        session: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            accounts,
            session: Arc::new(session),
        }
    }
}
