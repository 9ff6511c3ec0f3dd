//! services/web/src/web/context.rs
//!
//! The typed, request-scoped view of the session that handlers work with,
//! plus the extractors that hand it out.

use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Method, Uri},
};
use listings_core::{Account, SessionData, FLASH_ERROR};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to do that!";

#[derive(Debug)]
struct ContextState {
    session_id: String,
    data: SessionData,
    identity: Option<Account>,
    is_new: bool,
    modified: bool,
    rotated_from: Option<String>,
}

/// Session id, bound identity and flash queues for one request.
///
/// Cloning shares the same state; the pipeline keeps one clone to persist
/// whatever the handler changed.
#[derive(Clone, Debug)]
pub struct RequestContext {
    inner: Arc<Mutex<ContextState>>,
}

/// What the persist stage needs to write the session back.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub data: SessionData,
    pub is_new: bool,
    pub modified: bool,
    pub rotated_from: Option<String>,
}

impl RequestContext {
    pub fn new(
        session_id: String,
        data: SessionData,
        identity: Option<Account>,
        is_new: bool,
        modified: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ContextState {
                session_id,
                data,
                identity,
                is_new,
                modified,
                rotated_from: None,
            })),
        }
    }

    pub fn session_id(&self) -> String {
        self.inner.lock().session_id.clone()
    }

    pub fn identity(&self) -> Option<Account> {
        self.inner.lock().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().identity.is_some()
    }

    /// Queues a message for the next rendered page.
    pub fn flash(&self, category: &str, message: impl Into<String>) {
        let mut state = self.inner.lock();
        state.data.flash.push(category, message);
        state.modified = true;
    }

    pub fn drain_flash(&self, category: &str) -> Vec<String> {
        let mut state = self.inner.lock();
        let messages = state.data.flash.drain(category);
        if !messages.is_empty() {
            state.modified = true;
        }
        messages
    }

    /// Binds a verified account to the session under a fresh session id.
    pub fn bind_identity(&self, account: Account) {
        let mut state = self.inner.lock();
        state.data.account_id = Some(account.id);
        state.identity = Some(account);
        rotate(&mut state);
    }

    /// Drops the identity and moves to a fresh session id; the old record
    /// is deleted when the session is persisted.
    pub fn logout(&self) {
        let mut state = self.inner.lock();
        state.data.account_id = None;
        state.data.return_to = None;
        state.identity = None;
        rotate(&mut state);
    }

    pub fn set_return_to(&self, path: impl Into<String>) {
        let mut state = self.inner.lock();
        state.data.return_to = Some(path.into());
        state.modified = true;
    }

    pub fn take_return_to(&self) -> Option<String> {
        let mut state = self.inner.lock();
        let path = state.data.return_to.take();
        if path.is_some() {
            state.modified = true;
        }
        path
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.lock();
        SessionSnapshot {
            session_id: state.session_id.clone(),
            data: state.data.clone(),
            is_new: state.is_new,
            modified: state.modified,
            rotated_from: state.rotated_from.clone(),
        }
    }
}

fn rotate(state: &mut ContextState) {
    let old = std::mem::replace(&mut state.session_id, Uuid::new_v4().to_string());
    // A new session was never stored, so there is nothing to delete.
    if !state.is_new && state.rotated_from.is_none() {
        state.rotated_from = Some(old);
    }
    state.modified = true;
}

/// The three values every rendered page may read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Locals {
    pub success: Vec<String>,
    pub error: Vec<String>,
    #[serde(rename = "currentUser")]
    pub current_user: Option<Account>,
}

/// Reusable authorization check for protected handlers.
///
/// Without a bound identity this queues one error flash, remembers the
/// requested page for `GET` requests, and rejects.
pub fn authorize(ctx: &RequestContext, method: &Method, uri: &Uri) -> Result<Account, AppError> {
    if let Some(account) = ctx.identity() {
        return Ok(account);
    }
    if method == Method::GET {
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        ctx.set_return_to(path);
    }
    ctx.flash(FLASH_ERROR, LOGIN_REQUIRED_MESSAGE);
    Err(AppError::AuthorizationRequired)
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::internal("session pipeline is not installed"))
    }
}

impl<S> FromRequestParts<S> for Locals
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Locals>().cloned().unwrap_or_default())
    }
}

/// Extractor for handlers that require a logged-in account.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Account);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        authorize(&ctx, &parts.method, &parts.uri).map(CurrentUser)
    }
}
