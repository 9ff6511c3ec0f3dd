//! services/web/src/web/router.rs
//!
//! Assembles the routes, the session pipeline, and the outer layers.

use crate::error::panic_response;
use crate::web::auth::{login_form, login_handler, logout_handler, signup_form, signup_handler};
use crate::web::listings::{index_handler, new_listing_handler, not_found_handler, root_handler};
use crate::web::pipeline::{method_override, session_pipeline};
use crate::web::state::AppState;
use axum::{
    extract::Request,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::{util::MapRequestLayer, Layer};
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

/// The full service: method override in front of the router.
pub type App = tower::util::MapRequest<Router, fn(Request) -> Request>;

/// Routes behind the session pipeline, plus static files outside it.
pub fn build_router(state: Arc<AppState>, public_dir: &Path) -> Router {
    // Page routes (all behind the session pipeline)
    let pages = Router::new()
        .route("/", get(root_handler))
        .route("/listings", get(index_handler))
        .route("/listings/new", get(new_listing_handler))
        .route("/signup", get(signup_form).post(signup_handler))
        .route("/login", get(login_form).post(login_handler))
        .route("/logout", get(logout_handler).delete(logout_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session_pipeline,
        ))
        .with_state(state);

    // Static assets never touch the session store.
    Router::new()
        .nest_service("/public", ServeDir::new(public_dir))
        .merge(pages)
        .layer(TraceLayer::new_for_http())
}

/// Wraps the router so the method override runs before route matching.
pub fn app(state: Arc<AppState>, public_dir: &Path) -> App {
    let rewrite: fn(Request) -> Request = method_override;
    MapRequestLayer::new(rewrite).layer(build_router(state, public_dir))
}
