pub mod auth;
pub mod context;
pub mod cookie;
pub mod listings;
pub mod pipeline;
pub mod router;
pub mod state;
pub mod views;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

// Re-export the pieces the binary and tests wire together.
pub use context::{authorize, CurrentUser, Locals, RequestContext};
pub use pipeline::session_pipeline;
pub use router::{app, build_router, App};

/// A `302 Found` redirect.
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}
