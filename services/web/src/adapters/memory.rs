//! services/web/src/adapters/memory.rs
//!
//! In-process implementation of both store ports, used by the test suites.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use listings_core::domain::{Account, AccountCredentials, SessionData, SessionRecord};
use listings_core::ports::{AccountStore, PortError, PortResult, SessionStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    accounts: Mutex<HashMap<Uuid, AccountCredentials>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `PortError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn remove_account(&self, account_id: Uuid) {
        self.accounts.lock().remove(&account_id);
    }

    /// Direct access for tests that need to inspect or age a record.
    pub fn session(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub fn expire_session(&self, session_id: &str) {
        if let Some(record) = self.sessions.lock().get_mut(session_id) {
            record.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    fn check(&self) -> PortResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PortError::Unavailable("in-memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn get(&self, session_id: &str) -> PortResult<Option<SessionRecord>> {
        self.check()?;
        Ok(self.sessions.lock().get(session_id).cloned())
    }

    async fn set(&self, session_id: &str, data: &SessionData, ttl: Duration) -> PortResult<()> {
        self.check()?;
        let record = SessionRecord {
            id: session_id.to_string(),
            data: data.clone(),
            expires_at: Utc::now() + ttl,
        };
        self.sessions.lock().insert(session_id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> PortResult<()> {
        self.check()?;
        self.sessions.lock().remove(session_id);
        Ok(())
    }

    async fn delete_expired(&self) -> PortResult<u64> {
        self.check()?;
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account_by_id(&self, account_id: Uuid) -> PortResult<Account> {
        self.check()?;
        self.accounts
            .lock()
            .get(&account_id)
            .map(AccountCredentials::to_account)
            .ok_or_else(|| PortError::NotFound(format!("Account {} not found", account_id)))
    }

    async fn get_credentials_by_username(
        &self,
        username: &str,
    ) -> PortResult<AccountCredentials> {
        self.check()?;
        self.accounts
            .lock()
            .values()
            .find(|c| c.username == username)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Account not found".to_string()))
    }

    async fn create_account(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<Account> {
        self.check()?;
        let mut accounts = self.accounts.lock();
        if accounts
            .values()
            .any(|c| c.username == username || c.email == email)
        {
            return Err(PortError::Conflict("Account already exists".to_string()));
        }
        let credentials = AccountCredentials {
            account_id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        let account = credentials.to_account();
        accounts.insert(account.id, credentials);
        Ok(account)
    }
}
