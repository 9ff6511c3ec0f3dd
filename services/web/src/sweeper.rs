//! services/web/src/sweeper.rs
//!
//! Background task that drops expired session records.

use listings_core::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub fn spawn_session_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            debug!("Running expired-session sweep");
            match store.delete_expired().await {
                Ok(0) => {}
                Ok(n) => info!("Removed {} expired sessions", n),
                Err(e) => error!("Expired-session sweep failed: {:?}", e),
            }
        }
    })
}
