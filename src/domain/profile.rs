use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application-level user record, one-to-one with an auth account.
/// `user_email` is a denormalized copy of the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub user_email: String,
    #[serde(default)]
    pub user_class: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}
