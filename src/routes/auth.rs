use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use cookie::time::Duration as CookieDuration;
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::domain::account::{AuthUser, SessionTokens};
use crate::domain::role::{self, ResolvedRole};
use crate::error::ApiError;
use crate::infra::auth_api;
use crate::middleware as mw;
use crate::security::config::SecurityConfig;
use crate::security::jwt::Claims;
use crate::security::rate_limit;
use crate::state::AppState;

const REFRESH_TTL_DAYS: i64 = 30;
const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;
const BAD_CREDENTIALS: &str = "incorrect email or password";

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/logout", post(logout))
        .merge(
            Router::new()
                .route("/auth/me", get(me))
                .layer(from_fn_with_state(state, mw::auth::require_session)),
        )
}

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: AuthUser,
    role: ResolvedRole,
}

/// Sign-in for any account. The failure message never distinguishes an
/// unknown account from a wrong password.
async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    let (session, resolved) = sign_in(&state, &headers, &payload).await?;
    Ok(session_response(&state.security, session, resolved))
}

/// Sign-in for the admin area. A successful authentication with any
/// other role is signed out again so no session lingers for it.
async fn admin_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    let (session, resolved) = sign_in(&state, &headers, &payload).await?;
    if !resolved.is_admin() {
        if let Err(err) = auth_api::sign_out(&state.supabase, &session.access_token).await {
            tracing::warn!("failed to revoke non-admin session after login: {err}");
        }
        return Err(ApiError::Forbidden(format!(
            "access denied: role '{}' may not use the admin login",
            resolved.role
        )));
    }
    Ok(session_response(&state.security, session, resolved))
}

async fn sign_in(
    state: &AppState,
    headers: &HeaderMap,
    payload: &LoginPayload,
) -> Result<(SessionTokens, ResolvedRole), ApiError> {
    if let Some(ip) = extract_ip(headers) {
        if !rate_limit::check(&ip, 30, 60) {
            return Err(ApiError::RateLimited);
        }
    }
    if !validate_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }

    let session = auth_api::sign_in_with_password(&state.supabase, &payload.email, &payload.password)
        .await
        .map_err(map_sign_in_error)?;
    let resolved = role::resolve_for_account(
        state,
        session.user.id,
        session.user.metadata_role().as_deref(),
    )
    .await?;
    Ok((session, resolved))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = mw::auth::bearer_from_header(&headers)
        .or_else(|| mw::auth::cookie_token(&headers, &state.security.access_cookie_name));
    if let Some(token) = token {
        if let Err(err) = auth_api::sign_out(&state.supabase, &token).await {
            tracing::warn!("upstream sign-out failed: {err}");
        }
    }
    let mut res = Json(json!({ "success": true })).into_response();
    clear_cookies(&mut res, &state.security);
    Ok(res)
}

/// Session check used by the gated pages: who am I, and with what role.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized("invalid session subject".into()))?;
    let resolved =
        role::resolve_for_account(&state, user_id, claims.metadata_role().as_deref()).await?;
    Ok(Json(json!({
        "user": { "id": claims.sub, "email": claims.email },
        "role": resolved,
    })))
}

/// Any upstream rejection of the credentials collapses into one generic
/// message; only transport-level failures keep their own kind.
fn map_sign_in_error(err: ApiError) -> ApiError {
    match err {
        ApiError::Upstream { status, .. } if status.is_client_error() => {
            ApiError::Unauthorized(BAD_CREDENTIALS.into())
        }
        other => other,
    }
}

fn validate_email(email: &str) -> bool {
    email.contains('@') && email.len() <= 255
}

fn extract_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn session_response(
    cfg: &SecurityConfig,
    session: SessionTokens,
    role: ResolvedRole,
) -> Response {
    let access_ttl = session.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECS);
    let body = LoginResponse {
        access_token: session.access_token.clone(),
        refresh_token: session.refresh_token.clone(),
        user: session.user,
        role,
    };
    let mut res = Json(body).into_response();
    attach_cookie(
        &mut res,
        cfg,
        &cfg.access_cookie_name,
        &session.access_token,
        CookieDuration::seconds(access_ttl),
    );
    attach_cookie(
        &mut res,
        cfg,
        &cfg.refresh_cookie_name,
        &session.refresh_token,
        CookieDuration::days(REFRESH_TTL_DAYS),
    );
    res
}

fn attach_cookie(
    res: &mut Response,
    cfg: &SecurityConfig,
    name: &str,
    value: &str,
    max_age: CookieDuration,
) {
    let cookie = Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(cfg.secure_cookies)
        .same_site(cfg.same_site)
        .max_age(max_age)
        .path("/")
        .build()
        .to_string();
    if let Ok(header) = cookie.parse() {
        res.headers_mut().append(SET_COOKIE, header);
    }
}

fn clear_cookies(res: &mut Response, cfg: &SecurityConfig) {
    for name in [&cfg.access_cookie_name, &cfg.refresh_cookie_name] {
        attach_cookie(
            res,
            cfg,
            name,
            "",
            CookieDuration::seconds(0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn upstream_credential_rejections_become_one_generic_message() {
        let err = map_sign_in_error(ApiError::upstream(
            StatusCode::BAD_REQUEST,
            "Invalid login credentials",
        ));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), BAD_CREDENTIALS);

        let err = map_sign_in_error(ApiError::upstream(StatusCode::FORBIDDEN, "banned"));
        assert_eq!(err.to_string(), BAD_CREDENTIALS);
    }

    #[test]
    fn upstream_outages_keep_their_own_error() {
        let err = map_sign_in_error(ApiError::upstream(
            StatusCode::SERVICE_UNAVAILABLE,
            "gateway timeout",
        ));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn email_shape_check() {
        assert!(validate_email("a@x.com"));
        assert!(!validate_email("not-an-email"));
    }

    #[test]
    fn forwarded_ip_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(extract_ip(&headers).as_deref(), Some("203.0.113.5"));
        assert_eq!(extract_ip(&HeaderMap::new()), None);
    }
}
