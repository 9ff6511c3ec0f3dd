//! services/web/src/web/cookie.rs
//!
//! Reading, signing and writing the `session` cookie.
//!
//! The cookie value is `<session-id>.<tag>` where `tag` is the unpadded
//! base64url HMAC-SHA256 of the id under the configured secret.

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SESSION_COOKIE: &str = "session";

type HmacSha256 = Hmac<Sha256>;

fn mac_for(session_id: &str, secret: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(session_id.as_bytes());
    mac
}

pub fn sign_session_id(session_id: &str, secret: &str) -> String {
    let tag = mac_for(session_id, secret).finalize().into_bytes();
    format!("{}.{}", session_id, URL_SAFE_NO_PAD.encode(tag))
}

/// Returns the session id if the signature checks out.
pub fn verify_signed_cookie(value: &str, secret: &str) -> Option<String> {
    let (session_id, tag) = value.rsplit_once('.')?;
    if session_id.is_empty() {
        return None;
    }
    let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
    mac_for(session_id, secret).verify_slice(&tag).ok()?;
    Some(session_id.to_string())
}

/// Finds the raw `session` cookie value across all `Cookie` headers.
pub fn session_cookie_value(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
}

/// Builds the `Set-Cookie` value for a freshly written session.
pub fn session_cookie(signed_value: &str, max_age: Duration, secure: bool) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        signed_value,
        max_age.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    // Session ids and base64url tags are plain ASCII.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("session=; Max-Age=0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_cookie_verifies_with_same_secret_only() {
        let signed = sign_session_id("abc-123", "secret");
        assert_eq!(verify_signed_cookie(&signed, "secret").as_deref(), Some("abc-123"));
        assert_eq!(verify_signed_cookie(&signed, "other"), None);
    }

    #[test]
    fn tampered_id_is_rejected() {
        let signed = sign_session_id("abc-123", "secret");
        let forged = signed.replacen("abc", "abd", 1);
        assert_eq!(verify_signed_cookie(&forged, "secret"), None);
        assert_eq!(verify_signed_cookie("abc-123", "secret"), None);
        assert_eq!(verify_signed_cookie(".tag", "secret"), None);
    }

    #[test]
    fn finds_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("a=1; session=xyz.tag; b=2"));
        assert_eq!(session_cookie_value(&headers), Some("xyz.tag"));
    }

    #[test]
    fn cookie_attributes() {
        let value = session_cookie("id.tag", Duration::days(7), true);
        let value = value.to_str().unwrap();
        assert!(value.starts_with("session=id.tag;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=604800"));
        assert!(value.ends_with("; Secure"));
    }
}
