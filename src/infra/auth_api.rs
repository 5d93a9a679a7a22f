use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::supabase::{error_from_response, SupabaseCtx};
use crate::domain::account::{AuthUser, SessionTokens};
use crate::error::ApiError;

/// GoTrue calls. The `admin_*` functions use the service role key and are
/// only reachable behind the admin gate; the rest use the anon key plus,
/// where relevant, the caller's own access token.

pub async fn sign_in_with_password(
    ctx: &SupabaseCtx,
    email: &str,
    password: &str,
) -> Result<SessionTokens, ApiError> {
    let res = ctx
        .http
        .post(ctx.auth_endpoint("/token?grant_type=password"))
        .header("apikey", &ctx.anon_key)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    read_json(res).await
}

pub async fn sign_out(ctx: &SupabaseCtx, access_token: &str) -> Result<(), ApiError> {
    let res = ctx
        .http
        .post(ctx.auth_endpoint("/logout"))
        .header("apikey", &ctx.anon_key)
        .bearer_auth(access_token)
        .send()
        .await?;
    if !res.status().is_success() {
        return Err(error_from_response(res).await);
    }
    Ok(())
}

/// Creates the account with the email already confirmed, so the student
/// can log in without a verification round-trip.
pub async fn admin_create_user(
    ctx: &SupabaseCtx,
    email: &str,
    password: &str,
) -> Result<AuthUser, ApiError> {
    let res = ctx
        .http
        .post(ctx.auth_endpoint("/admin/users"))
        .header("apikey", &ctx.service_role_key)
        .header("Authorization", ctx.service_auth_header())
        .json(&json!({
            "email": email,
            "password": password,
            "email_confirm": true,
        }))
        .send()
        .await?;
    read_json(res).await
}

pub async fn admin_update_password(
    ctx: &SupabaseCtx,
    user_id: Uuid,
    password: &str,
) -> Result<AuthUser, ApiError> {
    let res = ctx
        .http
        .put(ctx.auth_endpoint(&format!("/admin/users/{user_id}")))
        .header("apikey", &ctx.service_role_key)
        .header("Authorization", ctx.service_auth_header())
        .json(&json!({ "password": password }))
        .send()
        .await?;
    read_json(res).await
}

pub async fn admin_delete_user(ctx: &SupabaseCtx, user_id: Uuid) -> Result<(), ApiError> {
    let res = ctx
        .http
        .delete(ctx.auth_endpoint(&format!("/admin/users/{user_id}")))
        .header("apikey", &ctx.service_role_key)
        .header("Authorization", ctx.service_auth_header())
        .send()
        .await?;
    if !res.status().is_success() {
        return Err(error_from_response(res).await);
    }
    Ok(())
}

/// Account lookup by id; a 404 is an answer, not a failure.
pub async fn admin_get_user(
    ctx: &SupabaseCtx,
    user_id: Uuid,
) -> Result<Option<AuthUser>, ApiError> {
    let res = ctx
        .http
        .get(ctx.auth_endpoint(&format!("/admin/users/{user_id}")))
        .header("apikey", &ctx.service_role_key)
        .header("Authorization", ctx.service_auth_header())
        .send()
        .await?;
    if res.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    read_json(res).await.map(Some)
}

#[derive(Debug, Deserialize)]
struct ListUsersResponse {
    users: Vec<AuthUser>,
}

pub async fn admin_list_users(ctx: &SupabaseCtx) -> Result<Vec<AuthUser>, ApiError> {
    let res = ctx
        .http
        .get(ctx.auth_endpoint("/admin/users?per_page=1000"))
        .header("apikey", &ctx.service_role_key)
        .header("Authorization", ctx.service_auth_header())
        .send()
        .await?;
    let body: ListUsersResponse = read_json(res).await?;
    Ok(body.users)
}

/// Accounts are keyed by id upstream; email lookups go through the full
/// list, the way the original admin tooling does it.
pub async fn find_user_by_email(
    ctx: &SupabaseCtx,
    email: &str,
) -> Result<Option<AuthUser>, ApiError> {
    let users = admin_list_users(ctx).await?;
    Ok(users.into_iter().find(|u| u.email.as_deref() == Some(email)))
}

async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiError> {
    if !res.status().is_success() {
        return Err(error_from_response(res).await);
    }
    res.json()
        .await
        .map_err(|err| ApiError::Unexpected(format!("malformed auth response: {err}")))
}
