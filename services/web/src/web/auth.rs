//! services/web/src/web/auth.rs
//!
//! Authentication endpoints for signup, login, and logout.

use crate::credentials::{self, AuthError};
use crate::error::AppError;
use crate::web::context::{Locals, RequestContext};
use crate::web::state::AppState;
use crate::web::{redirect, views};
use axum::{
    extract::{rejection::FormRejection, State},
    response::{Html, IntoResponse, Response},
    Form,
};
use listings_core::{PortError, FLASH_ERROR, FLASH_SUCCESS};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "incorrect username or password";

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn rejected(rejection: FormRejection) -> AppError {
    AppError::Unhandled {
        status: rejection.status(),
        message: rejection.body_text(),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /signup
pub async fn signup_form(locals: Locals) -> Html<String> {
    views::signup_page(&locals)
}

/// POST /signup - Create an account and log it in
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    form: Result<Form<SignupForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(rejected)?;
    let username = form.username.trim();
    let email = form.email.trim();

    if username.is_empty() || email.is_empty() || form.password.is_empty() {
        ctx.flash(FLASH_ERROR, "Username, email and password are all required");
        return Ok(redirect("/signup"));
    }

    let password_hash = credentials::hash_password(&form.password)
        .map_err(|e| AppError::internal(e.to_string()))?;

    match state
        .accounts
        .create_account(username, email, &password_hash)
        .await
    {
        Ok(account) => {
            info!(account_id = %account.id, "Account created");
            ctx.bind_identity(account);
            ctx.flash(FLASH_SUCCESS, "Welcome to Wanderlust!");
            Ok(redirect("/listings"))
        }
        Err(PortError::Conflict(_)) => {
            ctx.flash(
                FLASH_ERROR,
                "A user with the given username or email is already registered",
            );
            Ok(redirect("/signup"))
        }
        Err(e) => {
            error!("Failed to create account: {:?}", e);
            Err(AppError::StoreUnavailable(e.to_string()))
        }
    }
}

/// GET /login
pub async fn login_form(locals: Locals) -> Html<String> {
    views::login_page(&locals)
}

/// POST /login - Verify credentials and bind the account to the session
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(rejected)?;

    match credentials::verify(state.accounts.as_ref(), form.username.trim(), &form.password).await
    {
        Ok(account) => {
            info!(account_id = %account.id, "Login succeeded");
            ctx.bind_identity(account);
            ctx.flash(FLASH_SUCCESS, "Welcome back to Wanderlust!");
            let target = ctx.take_return_to().unwrap_or_else(|| "/listings".to_string());
            Ok(redirect(&target))
        }
        Err(AuthError::InvalidCredentials) => {
            ctx.flash(FLASH_ERROR, INVALID_CREDENTIALS_MESSAGE);
            Err(AppError::AuthenticationFailed)
        }
        Err(AuthError::Store(e)) => Err(AppError::StoreUnavailable(e.to_string())),
        Err(AuthError::Hash(e)) => Err(AppError::internal(e)),
    }
}

/// GET|POST /logout - Clear the identity and invalidate the session record
pub async fn logout_handler(ctx: RequestContext) -> impl IntoResponse {
    if let Some(account) = ctx.identity() {
        info!(account_id = %account.id, "Logged out");
    }
    ctx.logout();
    ctx.flash(FLASH_SUCCESS, "You are logged out!");
    redirect("/listings")
}
