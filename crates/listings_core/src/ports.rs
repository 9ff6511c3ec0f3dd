//! crates/listings_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! session pipeline to be independent of the concrete session and account stores.

use crate::domain::{Account, AccountCredentials, SessionData, SessionRecord};
use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The record exists but cannot be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Server-side session storage keyed by session id.
///
/// A single `get`, `set` or `delete` must be atomic for its record; no
/// multi-record transactions are needed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored record, or `None` if the id is unknown.
    /// Expired records may still be returned; callers check `expires_at`.
    /// An unreadable record is reported as `PortError::Corrupt`.
    async fn get(&self, session_id: &str) -> PortResult<Option<SessionRecord>>;

    /// Inserts or replaces the record, expiring `ttl` from now.
    async fn set(&self, session_id: &str, data: &SessionData, ttl: Duration) -> PortResult<()>;

    /// Removes the record. Deleting an unknown id is not an error.
    async fn delete(&self, session_id: &str) -> PortResult<()>;

    /// Removes every expired record, returning how many were dropped.
    async fn delete_expired(&self) -> PortResult<u64>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account_by_id(&self, account_id: Uuid) -> PortResult<Account>;

    async fn get_credentials_by_username(&self, username: &str)
        -> PortResult<AccountCredentials>;

    /// Fails with `PortError::Conflict` when the username or email is taken.
    async fn create_account(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<Account>;
}
