//! services/web/src/web/views.rs
//!
//! Minimal HTML shell. Pages only depend on `Locals` for the shared parts
//! (navigation and flash banners).

use crate::error::ErrorReport;
use crate::web::context::Locals;
use axum::response::Html;
use listings_core::Account;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn navbar(locals: &Locals) -> String {
    let right = match &locals.current_user {
        Some(user) => format!(
            r#"<span class="nav-user">{}</span> <a href="/logout">Log out</a>"#,
            escape(&user.username)
        ),
        None => r#"<a href="/signup">Sign up</a> <a href="/login">Log in</a>"#.to_string(),
    };
    format!(
        r#"<nav><a href="/listings">Explore</a> <a href="/listings/new">Add a listing</a> {}</nav>"#,
        right
    )
}

fn flashes(locals: &Locals) -> String {
    let banners = locals
        .success
        .iter()
        .map(|m| format!(r#"<div class="alert alert-success">{}</div>"#, escape(m)))
        .chain(
            locals
                .error
                .iter()
                .map(|m| format!(r#"<div class="alert alert-error">{}</div>"#, escape(m))),
        );
    banners.collect::<Vec<_>>().join("\n")
}

fn layout(locals: &Locals, title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="/public/css/style.css">
</head>
<body>
{nav}
{flash}
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav = navbar(locals),
        flash = flashes(locals),
        body = body,
    ))
}

pub fn listings_page(locals: &Locals) -> Html<String> {
    layout(locals, "All Listings", "<h1>All Listings</h1>")
}

pub fn new_listing_page(locals: &Locals, account: &Account) -> Html<String> {
    let body = format!(
        "<h1>Create a new listing</h1>\n<p>Posting as {}</p>",
        escape(&account.username)
    );
    layout(locals, "New Listing", &body)
}

pub fn login_page(locals: &Locals) -> Html<String> {
    layout(
        locals,
        "Log in",
        r#"<h1>Log in</h1>
<form method="POST" action="/login">
<input name="username" placeholder="username" required>
<input name="password" type="password" placeholder="password" required>
<button>Log in</button>
</form>"#,
    )
}

pub fn signup_page(locals: &Locals) -> Html<String> {
    layout(
        locals,
        "Sign up",
        r#"<h1>Sign up</h1>
<form method="POST" action="/signup">
<input name="username" placeholder="username" required>
<input name="email" type="email" placeholder="email" required>
<input name="password" type="password" placeholder="password" required>
<button>Sign up</button>
</form>"#,
    )
}

pub fn error_page(locals: &Locals, report: &ErrorReport) -> Html<String> {
    let body = format!(
        r#"<div class="error"><h1>{}</h1><p>{}</p></div>"#,
        report.status.as_u16(),
        escape(&report.message)
    );
    layout(locals, "Error", &body)
}
