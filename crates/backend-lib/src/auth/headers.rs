// ============================
// crates/backend-lib/src/auth/headers.rs
// ============================
//! `Authorization` header parsing.
use axum::http::{header::AUTHORIZATION, HeaderMap};

fn authorization_with_scheme<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(scheme)?
        .strip_prefix(' ')
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    authorization_with_scheme(headers, "Bearer")
}

/// Key from `Authorization: ApiKey <key>`
pub fn api_key(headers: &HeaderMap) -> Option<&str> {
    authorization_with_scheme(headers, "ApiKey")
}
