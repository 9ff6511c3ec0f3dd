//! services/web/src/error.rs
//!
//! Defines the startup error type and the per-request error taxonomy.

use crate::config::ConfigError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

/// Message shown for failures the user cannot act on.
pub const GENERIC_MESSAGE: &str = "Something went wrong!";
pub const NOT_FOUND_MESSAGE: &str = "Page Not Found";

/// The primary error type for starting the `web` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors a request can end in. Every variant is turned into a response;
/// none of them aborts the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The session or account store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Submitted credentials did not match. The caller queues the flash.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// A protected page was requested without a bound identity.
    #[error("Authentication required")]
    AuthorizationRequired,

    #[error("Not found")]
    NotFound,

    #[error("{message}")]
    Unhandled { status: StatusCode, message: String },
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Unhandled {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

/// Attached to error responses so the pipeline's boundary stage can render
/// the error page with the request's locals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = match self {
            AppError::AuthenticationFailed | AppError::AuthorizationRequired => {
                return crate::web::redirect("/login");
            }
            AppError::StoreUnavailable(detail) => {
                error!("Store unavailable: {}", detail);
                ErrorReport {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    message: GENERIC_MESSAGE.to_string(),
                }
            }
            AppError::NotFound => ErrorReport {
                status: StatusCode::NOT_FOUND,
                message: NOT_FOUND_MESSAGE.to_string(),
            },
            AppError::Unhandled { status, message } => {
                if status.is_server_error() {
                    error!("Unhandled error ({}): {}", status, message);
                }
                // Internal details never reach the page.
                let message = if status.is_server_error() || message.is_empty() {
                    GENERIC_MESSAGE.to_string()
                } else {
                    message
                };
                ErrorReport { status, message }
            }
        };

        let mut response = (
            report.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
            report.message.clone(),
        )
            .into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Converts a caught handler panic into the generic error response.
pub fn panic_response(_panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    AppError::internal("handler panicked").into_response()
}
