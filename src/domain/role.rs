use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::infra::postgrest::TableRequest;
use crate::state::AppState;

pub const ADMIN_ROLE: &str = "admin";
pub const STUDENT_ROLE: &str = "student";
pub const DEFAULT_ROLE: &str = "user";

/// Where a resolved role came from. The role lives in two places (auth
/// metadata and the profiles table); resolution is explicit so the
/// precedence is visible and testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSource {
    Metadata,
    Profile,
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRole {
    pub source: RoleSource,
    pub role: String,
}

impl ResolvedRole {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Metadata wins; the profile row is the fallback; an account known to
/// neither resolves to `"user"`, never `"admin"`.
pub fn resolve(metadata_role: Option<&str>, profile_role: Option<&str>) -> ResolvedRole {
    if let Some(role) = non_empty(metadata_role) {
        return ResolvedRole {
            source: RoleSource::Metadata,
            role,
        };
    }
    if let Some(role) = non_empty(profile_role) {
        return ResolvedRole {
            source: RoleSource::Profile,
            role,
        };
    }
    ResolvedRole {
        source: RoleSource::Default,
        role: DEFAULT_ROLE.to_string(),
    }
}

fn non_empty(role: Option<&str>) -> Option<String> {
    role.map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct ProfileRoleRow {
    #[serde(default)]
    role: Option<String>,
}

/// Resolves the role for one account, hitting the profiles table only
/// when auth metadata is silent.
pub async fn resolve_for_account(
    state: &AppState,
    user_id: Uuid,
    metadata_role: Option<&str>,
) -> Result<ResolvedRole, ApiError> {
    if non_empty(metadata_role).is_some() {
        return Ok(resolve(metadata_role, None));
    }
    let row: Option<ProfileRoleRow> = TableRequest::service(&state.supabase, "profiles")
        .select("role")
        .eq("id", user_id)
        .fetch_optional()
        .await?;
    Ok(resolve(None, row.and_then(|r| r.role).as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_takes_precedence_over_profile() {
        let resolved = resolve(Some("admin"), Some("student"));
        assert_eq!(resolved.source, RoleSource::Metadata);
        assert_eq!(resolved.role, "admin");
        assert!(resolved.is_admin());
    }

    #[test]
    fn profile_is_the_fallback() {
        let resolved = resolve(None, Some("student"));
        assert_eq!(resolved.source, RoleSource::Profile);
        assert_eq!(resolved.role, "student");
        assert!(!resolved.is_admin());
    }

    #[test]
    fn unknown_accounts_default_to_user_never_admin() {
        for (meta, profile) in [(None, None), (Some(""), None), (Some("  "), Some(""))] {
            let resolved = resolve(meta, profile);
            assert_eq!(resolved.source, RoleSource::Default);
            assert_eq!(resolved.role, DEFAULT_ROLE);
            assert!(!resolved.is_admin());
        }
    }

    #[test]
    fn empty_metadata_falls_through_to_profile() {
        let resolved = resolve(Some(""), Some("admin"));
        assert_eq!(resolved.source, RoleSource::Profile);
        assert!(resolved.is_admin());
    }
}
