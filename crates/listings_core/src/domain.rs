//! crates/listings_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or web framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Flash category shown as a confirmation banner.
pub const FLASH_SUCCESS: &str = "success";
/// Flash category shown as an error banner.
pub const FLASH_ERROR: &str = "error";

// Represents an account - the identity bound to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account_id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

impl AccountCredentials {
    pub fn to_account(&self) -> Account {
        Account {
            id: self.account_id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Per-category queues of one-time messages.
///
/// Messages keep their insertion order within a category. Draining a
/// category removes it entirely, so each message is read at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlashQueues(BTreeMap<String, Vec<String>>);

impl FlashQueues {
    pub fn push(&mut self, category: &str, message: impl Into<String>) {
        self.0
            .entry(category.to_string())
            .or_default()
            .push(message.into());
    }

    /// Removes and returns every message queued under `category`.
    pub fn drain(&mut self, category: &str) -> Vec<String> {
        self.0.remove(category).unwrap_or_default()
    }

    pub fn peek(&self, category: &str) -> &[String] {
        self.0.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

/// The serialized state stored behind a session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// The bound identity, if the session has authenticated.
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub flash: FlashQueues,
    /// Path to resume after a login forced by a protected page.
    #[serde(default)]
    pub return_to: Option<String>,
    /// When the record was last written to the store.
    pub touched_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            account_id: None,
            flash: FlashQueues::default(),
            return_to: None,
            touched_at: now,
        }
    }
}

/// A session as held by the backing store.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub data: SessionData,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
