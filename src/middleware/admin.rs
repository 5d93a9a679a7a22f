use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::domain::role;
use crate::error::ApiError;
use crate::security::jwt::Claims;
use crate::state::AppState;

/// Admin gate, layered inside `require_session`. Resolves the caller's
/// role (metadata, then profile, then the `"user"` default) and refuses
/// anything that is not exactly `admin`.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("missing session token".into()))?;

    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized("invalid session subject".into()))?;

    let resolved =
        role::resolve_for_account(&state, user_id, claims.metadata_role().as_deref()).await?;
    if !resolved.is_admin() {
        return Err(ApiError::Forbidden(format!(
            "access denied: role '{}' is not admin",
            resolved.role
        )));
    }
    Ok(next.run(req).await)
}
