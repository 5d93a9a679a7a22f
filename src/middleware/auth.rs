use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use cookie::Cookie;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// The caller's raw access token, kept alongside the verified claims so
/// handlers can relay it for reads that stay under row-level security.
#[derive(Clone)]
pub struct SessionToken(pub String);

/// Session gate: a bearer token (header first, cookie fallback) that
/// verifies against the auth service's JWT secret. Inserts the claims
/// and the raw token into request extensions.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_from_header(req.headers())
        .or_else(|| cookie_token(req.headers(), &state.security.access_cookie_name))
        .ok_or_else(|| ApiError::Unauthorized("missing session token".into()))?;

    let claims = state
        .verifier
        .verify(&token)
        .map_err(|_| ApiError::Unauthorized("invalid or expired session token".into()))?;

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(SessionToken(token));
    Ok(next.run(req).await)
}

pub fn bearer_from_header(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

pub fn cookie_token(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        if let Ok(parsed) = Cookie::parse(part.trim().to_string()) {
            if parsed.name() == name {
                return Some(parsed.value().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn bearer_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(bearer_from_header(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwdw=="),
        );
        assert_eq!(bearer_from_header(&headers), None);
    }

    #[test]
    fn cookie_fallback_finds_the_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; access_token=tok456; theme=dark"),
        );
        assert_eq!(
            cookie_token(&headers, "access_token").as_deref(),
            Some("tok456")
        );
        assert_eq!(cookie_token(&headers, "missing"), None);
    }
}
