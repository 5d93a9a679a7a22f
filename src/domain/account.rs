use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An identity record in the auth store. Supabase owns the credential
/// material; we only ever see the id, email and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Role as stored in auth metadata, when present. Profile fallback
    /// and the `"user"` default live in `domain::role`.
    pub fn metadata_role(&self) -> Option<String> {
        self.user_metadata
            .get("role")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Password-grant response from the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_role_reads_the_role_key() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "email": "a@x.com",
            "user_metadata": {"role": "admin"}
        }))
        .unwrap();
        assert_eq!(user.metadata_role().as_deref(), Some("admin"));
    }

    #[test]
    fn missing_metadata_yields_no_role() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6"
        }))
        .unwrap();
        assert_eq!(user.email, None);
        assert_eq!(user.metadata_role(), None);
    }
}
