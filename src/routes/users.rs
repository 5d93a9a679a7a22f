use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::profile::Profile;
use crate::domain::role::{self, RoleSource, STUDENT_ROLE};
use crate::error::ApiError;
use crate::infra::auth_api;
use crate::infra::postgrest::TableRequest;
use crate::infra::storage;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserPayload {
    email: Option<String>,
    password: Option<String>,
    full_name: Option<String>,
    user_class: Option<String>,
}

/// Create the auth account (email pre-confirmed), then the matching
/// profile with role `student`. A failed profile write triggers a
/// best-effort compensating delete of the fresh account; there is no
/// transactional guarantee across the two stores.
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddUserPayload>,
) -> Result<Json<Value>, ApiError> {
    let email = required(payload.email, "email")?;
    let password = required(payload.password, "password")?;
    let full_name = required(payload.full_name, "fullName")?;
    let user_class = required(payload.user_class, "userClass")?;

    let user = auth_api::admin_create_user(&state.supabase, &email, &password).await?;

    let mut fields = Map::new();
    fields.insert("full_name".into(), full_name.into());
    fields.insert("user_email".into(), email.into());
    fields.insert("user_class".into(), user_class.into());
    fields.insert("role".into(), STUDENT_ROLE.into());

    if let Err(err) = upsert_profile(&state, user.id, fields).await {
        tracing::error!("profile write failed for new account {}: {err}", user.id);
        if let Err(del_err) = auth_api::admin_delete_user(&state.supabase, user.id).await {
            tracing::error!(
                "compensating account delete failed for {}: {del_err}",
                user.id
            );
        }
        return Err(err);
    }

    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Deserialize)]
struct IdRow {
    id: Uuid,
}

async fn upsert_profile(
    state: &AppState,
    user_id: Uuid,
    fields: Map<String, Value>,
) -> Result<(), ApiError> {
    let existing: Option<IdRow> = TableRequest::service(&state.supabase, "profiles")
        .select("id")
        .eq("id", user_id)
        .fetch_optional()
        .await?;

    if existing.is_some() {
        let _: Vec<Profile> = TableRequest::service(&state.supabase, "profiles")
            .eq("id", user_id)
            .update(&Value::Object(fields))
            .await?;
    } else {
        let mut insert = fields;
        insert.insert("id".into(), json!(user_id));
        let _: Profile = TableRequest::service(&state.supabase, "profiles")
            .insert(&Value::Object(insert))
            .await?;
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditUserPayload {
    email: Option<String>,
    full_name: Option<String>,
    user_class: Option<String>,
    #[serde(default)]
    password: Option<String>,
    /// Absent = leave unchanged, null = remove, string = replace.
    #[serde(default, deserialize_with = "tri_state")]
    avatar_url: Option<Option<String>>,
}

fn tri_state<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct AvatarRow {
    #[serde(default)]
    avatar_url: Option<String>,
}

/// Profile edit keyed by email. Avatar removal also deletes the stored
/// blob; that deletion failing is logged, not fatal. A new password is
/// applied to the account resolved by email.
pub async fn edit_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EditUserPayload>,
) -> Result<Json<Value>, ApiError> {
    let email = required(payload.email, "email")?;
    let full_name = required(payload.full_name, "fullName")?;
    let user_class = required(payload.user_class, "userClass")?;

    let current: Option<AvatarRow> = TableRequest::service(&state.supabase, "profiles")
        .select("avatar_url")
        .eq("user_email", &email)
        .fetch_optional()
        .await?;
    let current = current.ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if payload.avatar_url == Some(None) {
        if let Some(stored) = current.avatar_url.as_deref() {
            match storage::object_name_from_public_url(stored) {
                Some(object) => {
                    if let Err(err) = storage::remove_avatar(&state.supabase, object).await {
                        tracing::warn!("failed to delete avatar blob {object}: {err}");
                    }
                }
                None => tracing::warn!("stored avatar url has no object name: {stored}"),
            }
        }
    }

    let mut update = Map::new();
    update.insert("full_name".into(), full_name.into());
    update.insert("user_class".into(), user_class.into());
    match &payload.avatar_url {
        Some(Some(url)) => {
            update.insert("avatar_url".into(), json!(url));
        }
        Some(None) => {
            update.insert("avatar_url".into(), Value::Null);
        }
        None => {}
    }

    let data: Vec<Profile> = TableRequest::service(&state.supabase, "profiles")
        .eq("user_email", &email)
        .update(&Value::Object(update))
        .await?;

    if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
        let user = auth_api::find_user_by_email(&state.supabase, &email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        auth_api::admin_update_password(&state.supabase, user.id, &password).await?;
    }

    Ok(Json(json!({ "message": "User updated successfully", "data": data })))
}

#[derive(Deserialize)]
pub struct DeleteUserPayload {
    email: Option<String>,
}

/// Delete the account, then the profile row. When the account is
/// already gone the handler still clears the profile, so re-running a
/// partially failed delete converges instead of stranding the row.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeleteUserPayload>,
) -> Result<Json<Value>, ApiError> {
    let email = required(payload.email, "email")?;

    let account = auth_api::find_user_by_email(&state.supabase, &email).await?;
    if account.is_none() {
        let orphan: Option<IdRow> = TableRequest::service(&state.supabase, "profiles")
            .select("id")
            .eq("user_email", &email)
            .fetch_optional()
            .await?;
        if orphan.is_none() {
            return Err(ApiError::NotFound("User not found".into()));
        }
        tracing::warn!("no auth account for {email}; removing the orphaned profile row");
    }

    if let Some(account) = account {
        auth_api::admin_delete_user(&state.supabase, account.id).await?;
    }

    TableRequest::service(&state.supabase, "profiles")
        .eq("user_email", &email)
        .delete()
        .await?;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

pub async fn get_students(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let students: Vec<Profile> = TableRequest::service(&state.supabase, "profiles")
        .eq("role", STUDENT_ROLE)
        .order("full_name", true)
        .fetch()
        .await?;
    Ok(Json(json!({ "success": true, "students": students })))
}

#[derive(Deserialize)]
pub struct EmailQuery {
    email: Option<String>,
}

pub async fn get_user_by_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Profile>, ApiError> {
    let email = required(query.email, "email")?;
    let profile: Option<Profile> = TableRequest::service(&state.supabase, "profiles")
        .eq("user_email", &email)
        .fetch_optional()
        .await?;
    profile
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRolePayload {
    user_id: Option<Uuid>,
}

/// Role lookup by account id. An account that exists but has no
/// profile row defaults to `"user"`; an id that matches no account at
/// all is a not-found.
pub async fn check_admin_role(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckRolePayload>,
) -> Result<Json<Value>, ApiError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::Validation("User ID is required".into()))?;
    let resolved = role::resolve_for_account(&state, user_id, None).await?;
    if resolved.source == RoleSource::Default
        && auth_api::admin_get_user(&state.supabase, user_id)
            .await?
            .is_none()
    {
        return Err(ApiError::NotFound("User not found".into()));
    }
    Ok(Json(json!({ "role": resolved.role })))
}

#[derive(Deserialize)]
pub struct MakeAdminPayload {
    email: Option<String>,
}

/// Promote an existing profile to the admin role.
pub async fn make_admin(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MakeAdminPayload>,
) -> Result<Json<Value>, ApiError> {
    let email = required(payload.email, "email")?;
    let profile: Option<IdRow> = TableRequest::service(&state.supabase, "profiles")
        .select("id")
        .eq("user_email", &email)
        .fetch_optional()
        .await?;
    let profile = profile.ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let _: Vec<Profile> = TableRequest::service(&state.supabase, "profiles")
        .eq("id", profile.id)
        .update(&json!({ "role": role::ADMIN_ROLE }))
        .await?;

    Ok(Json(json!({ "success": true, "message": "User role updated to admin" })))
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{name} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_url_absent_means_leave_unchanged() {
        let payload: EditUserPayload = serde_json::from_str(
            r#"{"email":"a@x.com","fullName":"Ali","userClass":"5A"}"#,
        )
        .unwrap();
        assert_eq!(payload.avatar_url, None);
    }

    #[test]
    fn avatar_url_null_means_explicit_removal() {
        let payload: EditUserPayload = serde_json::from_str(
            r#"{"email":"a@x.com","fullName":"Ali","userClass":"5A","avatarUrl":null}"#,
        )
        .unwrap();
        assert_eq!(payload.avatar_url, Some(None));
    }

    #[test]
    fn avatar_url_string_means_replace() {
        let payload: EditUserPayload = serde_json::from_str(
            r#"{"email":"a@x.com","fullName":"Ali","userClass":"5A","avatarUrl":"https://x/y.png"}"#,
        )
        .unwrap();
        assert_eq!(payload.avatar_url, Some(Some("https://x/y.png".into())));
    }

    #[test]
    fn payload_field_names_are_camel_case() {
        let payload: AddUserPayload = serde_json::from_str(
            r#"{"email":"a@x.com","password":"pw","fullName":"Ali","userClass":"5A"}"#,
        )
        .unwrap();
        assert_eq!(payload.full_name.as_deref(), Some("Ali"));
        assert_eq!(payload.user_class.as_deref(), Some("5A"));
    }

    #[test]
    fn required_rejects_missing_and_blank_values() {
        assert!(required(None, "email").is_err());
        assert!(required(Some("   ".into()), "email").is_err());
        assert_eq!(required(Some(" a@x.com ".into()), "email").unwrap(), "a@x.com");
    }
}
