//! services/web/src/web/pipeline.rs
//!
//! The session pipeline wrapped around every page request.
//!
//! Stages run in a fixed order, each either producing the state for the next
//! stage or ending the request with an error response:
//!
//! read cookie -> load session -> resolve identity -> expose locals
//!     -> handler -> persist -> error boundary

use crate::config::SessionConfig;
use crate::error::{AppError, ErrorReport};
use crate::web::context::{Locals, RequestContext};
use crate::web::cookie;
use crate::web::state::AppState;
use crate::web::views;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use listings_core::{
    AccountStore, PortError, SessionData, SessionStore, FLASH_ERROR, FLASH_SUCCESS,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// The session as it comes out of the store, before handlers touch it.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub id: String,
    pub data: SessionData,
    pub is_new: bool,
    /// Set when loading already changed the data (e.g. a stale identity was dropped).
    pub modified: bool,
}

impl LoadedSession {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: SessionData::new(now),
            is_new: true,
            modified: false,
        }
    }
}

fn store_failure(e: PortError) -> AppError {
    AppError::StoreUnavailable(e.to_string())
}

//=========================================================================================
// Stages
//=========================================================================================

/// Extracts a correctly signed session id from the request cookies.
pub fn read_session_id(headers: &HeaderMap, secret: &str) -> Option<String> {
    let raw = cookie::session_cookie_value(headers)?;
    let session_id = cookie::verify_signed_cookie(raw, secret);
    if session_id.is_none() {
        warn!("Ignoring session cookie with a bad signature");
    }
    session_id
}

/// Fetches the session named by the cookie, or starts a new one.
///
/// Unknown, expired and unreadable ids yield a new session. A store failure
/// ends the request; it never degrades to an anonymous session.
pub async fn load_session(
    store: &dyn SessionStore,
    session_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LoadedSession, AppError> {
    let Some(session_id) = session_id else {
        return Ok(LoadedSession::fresh(now));
    };

    let found = match store.get(session_id).await {
        Ok(found) => found,
        Err(PortError::Corrupt(detail)) => {
            warn!("Discarding unreadable session: {}", detail);
            store.delete(session_id).await.map_err(store_failure)?;
            return Ok(LoadedSession::fresh(now));
        }
        Err(e) => return Err(store_failure(e)),
    };

    match found {
        Some(record) if !record.is_expired(now) => Ok(LoadedSession {
            id: record.id,
            data: record.data,
            is_new: false,
            modified: false,
        }),
        Some(_) => {
            debug!("Session expired, starting a new one");
            store.delete(session_id).await.map_err(store_failure)?;
            Ok(LoadedSession::fresh(now))
        }
        None => Ok(LoadedSession::fresh(now)),
    }
}

/// Resolves the bound account. A reference to a deleted account is dropped
/// and the request continues anonymously.
pub async fn resolve_identity(
    accounts: &dyn AccountStore,
    session: &mut LoadedSession,
) -> Result<Option<listings_core::Account>, AppError> {
    let Some(account_id) = session.data.account_id else {
        return Ok(None);
    };

    match accounts.get_account_by_id(account_id).await {
        Ok(account) => Ok(Some(account)),
        Err(PortError::NotFound(_)) => {
            warn!(%account_id, "Session refers to a missing account; treating as anonymous");
            session.data.account_id = None;
            session.modified = true;
            Ok(None)
        }
        Err(e) => Err(store_failure(e)),
    }
}

/// Drains the flash queues into the values the view layer reads.
pub fn expose_locals(ctx: &RequestContext) -> Locals {
    Locals {
        success: ctx.drain_flash(FLASH_SUCCESS),
        error: ctx.drain_flash(FLASH_ERROR),
        current_user: ctx.identity(),
    }
}

/// Writes the session back when needed and returns the cookie to set.
///
/// Unchanged sessions are only rewritten once `touch_after` has passed since
/// their last write. Every write re-issues the cookie, so expiry slides.
pub async fn persist_session(
    store: &dyn SessionStore,
    ctx: &RequestContext,
    config: &SessionConfig,
    now: DateTime<Utc>,
) -> Result<Option<HeaderValue>, AppError> {
    let snapshot = ctx.snapshot();

    if let Some(old_id) = &snapshot.rotated_from {
        store.delete(old_id).await.map_err(store_failure)?;
    }

    let stale = now - snapshot.data.touched_at >= config.touch_after;
    let must_write =
        snapshot.is_new || snapshot.modified || snapshot.rotated_from.is_some() || stale;
    if !must_write {
        return Ok(None);
    }

    let mut data = snapshot.data;
    data.touched_at = now;
    store
        .set(&snapshot.session_id, &data, config.ttl)
        .await
        .map_err(store_failure)?;

    let signed = cookie::sign_session_id(&snapshot.session_id, &config.secret);
    Ok(Some(cookie::session_cookie(
        &signed,
        config.ttl,
        config.cookie_secure,
    )))
}

/// Renders responses carrying an `ErrorReport` as the error page.
pub fn error_boundary(response: Response, locals: &Locals) -> Response {
    match response.extensions().get::<ErrorReport>().cloned() {
        Some(report) => {
            let mut page = (report.status, views::error_page(locals, &report)).into_response();
            page.extensions_mut().insert(report);
            page
        }
        None => response,
    }
}

//=========================================================================================
// Middleware
//=========================================================================================

/// Axum middleware running every stage around the inner handler.
pub async fn session_pipeline(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    match run_pipeline(&state, req, next).await {
        Ok(response) => response,
        Err(err) => error_boundary(err.into_response(), &Locals::default()),
    }
}

async fn run_pipeline(state: &AppState, mut req: Request, next: Next) -> Result<Response, AppError> {
    let now = Utc::now();

    let cookie_id = read_session_id(req.headers(), &state.session.secret);
    let mut loaded = load_session(state.sessions.as_ref(), cookie_id.as_deref(), now).await?;
    let identity = resolve_identity(state.accounts.as_ref(), &mut loaded).await?;

    let ctx = RequestContext::new(
        loaded.id,
        loaded.data,
        identity,
        loaded.is_new,
        loaded.modified,
    );
    let locals = expose_locals(&ctx);
    req.extensions_mut().insert(ctx.clone());
    req.extensions_mut().insert(locals.clone());

    let response = next.run(req).await;

    let cookie = persist_session(state.sessions.as_ref(), &ctx, &state.session, now).await?;
    let mut response = error_boundary(response, &locals);
    if let Some(cookie) = cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Lets HTML forms reach other methods via `POST ...?_method=DELETE`.
/// Any standard HTTP method is accepted; extension methods are ignored.
/// Applied before routing.
pub fn method_override(mut req: Request) -> Request {
    if req.method() == Method::POST {
        if let Some(method) = override_target(req.uri().query()) {
            debug!(method = method.as_str(), "Overriding POST method");
            *req.method_mut() = method;
        }
    }
    req
}

fn override_target(query: Option<&str>) -> Option<Method> {
    let (_, value) = query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "_method")?;
    let method = Method::from_bytes(value.to_ascii_uppercase().as_bytes()).ok()?;
    [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
        Method::CONNECT,
    ]
    .contains(&method)
    .then_some(method)
}
