use reqwest::Client;
use tracing::warn;

use crate::error::ApiError;

/// Connection context for the hosted Supabase project. Built once at
/// startup and shared through `AppState`; the service role key is what
/// lets the privileged handlers bypass row-level security.
#[derive(Clone)]
pub struct SupabaseCtx {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: String,
    pub jwt_secret: String,
    pub http: Client,
}

impl SupabaseCtx {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = first_env(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]).ok_or_else(|| {
            anyhow::anyhow!("Supabase URL missing (set SUPABASE_URL or NEXT_PUBLIC_SUPABASE_URL)")
        })?;
        let anon_key = first_env(&[
            "SUPABASE_ANON_KEY",
            "NEXT_PUBLIC_SUPABASE_ANON_KEY",
            "SUPABASE_KEY",
        ])
        .ok_or_else(|| anyhow::anyhow!("Supabase anon key missing"))?;
        let service_role_key =
            first_env(&["SUPABASE_SERVICE_ROLE_KEY", "SUPABASE_SERVICE_KEY"]).ok_or_else(|| {
                anyhow::anyhow!(
                    "SUPABASE_SERVICE_ROLE_KEY missing; the admin handlers cannot run without it"
                )
            })?;
        let jwt_secret = first_env(&["SUPABASE_JWT_SECRET", "JWT_SECRET"]).unwrap_or_else(|| {
            warn!("SUPABASE_JWT_SECRET missing; falling back to the service role key");
            service_role_key.clone()
        });

        let http = Client::builder().user_agent("quran-report-api").build()?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            service_role_key,
            jwt_secret,
            http,
        })
    }

    pub fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    pub fn rest_endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    pub fn storage_object_endpoint(&self, bucket: &str, object: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, bucket, object)
    }

    pub fn service_auth_header(&self) -> String {
        format!("Bearer {}", self.service_role_key)
    }
}

fn first_env(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(val) = std::env::var(key) {
            if !val.trim().is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Turns a non-2xx Supabase response into an `ApiError`, pulling the
/// human-readable message out of whichever field this particular
/// sub-service uses.
pub(crate) async fn error_from_response(res: reqwest::Response) -> ApiError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    ApiError::upstream(status, upstream_message(&body))
}

fn upstream_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    if body.trim().is_empty() {
        "upstream request failed".to_string()
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> SupabaseCtx {
        SupabaseCtx {
            url: "https://proj.supabase.co".into(),
            anon_key: "anon".into(),
            service_role_key: "service".into(),
            jwt_secret: "secret".into(),
            http: Client::new(),
        }
    }

    #[test]
    fn endpoints_are_rooted_at_each_sub_service() {
        let ctx = ctx();
        assert_eq!(
            ctx.auth_endpoint("/token?grant_type=password"),
            "https://proj.supabase.co/auth/v1/token?grant_type=password"
        );
        assert_eq!(
            ctx.rest_endpoint("profiles"),
            "https://proj.supabase.co/rest/v1/profiles"
        );
        assert_eq!(
            ctx.storage_object_endpoint("avatars", "a.png"),
            "https://proj.supabase.co/storage/v1/object/avatars/a.png"
        );
    }

    #[test]
    fn upstream_message_prefers_known_fields() {
        assert_eq!(
            upstream_message(r#"{"msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            upstream_message(r#"{"message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(
            upstream_message(r#"{"error":"invalid_grant","error_description":"Bad password"}"#),
            "Bad password"
        );
        assert_eq!(upstream_message("plain text"), "plain text");
        assert_eq!(upstream_message(""), "upstream request failed");
    }
}
