//! services/web/src/web/listings.rs
//!
//! Page endpoints the session pipeline guards and redirects to.

use crate::error::AppError;
use crate::web::context::{CurrentUser, Locals};
use crate::web::{redirect, views};
use axum::response::{Html, Response};

/// GET / - The listings index is the landing page.
pub async fn root_handler() -> Response {
    redirect("/listings")
}

/// GET /listings
pub async fn index_handler(locals: Locals) -> Html<String> {
    views::listings_page(&locals)
}

/// GET /listings/new - Requires a logged-in account.
pub async fn new_listing_handler(CurrentUser(account): CurrentUser, locals: Locals) -> Html<String> {
    views::new_listing_page(&locals, &account)
}

/// Fallback for every unmatched route.
pub async fn not_found_handler() -> AppError {
    AppError::NotFound
}
