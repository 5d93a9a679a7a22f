use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Claims of a Supabase access token. `role` here is the database role
/// (`authenticated`); the application role lives in `user_metadata` and
/// the profiles table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::Token("malformed subject".into()))
    }

    pub fn metadata_role(&self) -> Option<String> {
        self.user_metadata
            .get("role")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token error: {0}")]
    Token(String),
}

/// Verifies session tokens issued by the auth service. We never issue
/// tokens ourselves.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| JwtError::Token(e.to_string()))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn mint(secret: &str, claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token should encode")
    }

    fn far_future() -> i64 {
        4102444800 // 2100-01-01
    }

    #[test]
    fn verifies_a_supabase_shaped_token() {
        let verifier = TokenVerifier::new("test-secret");
        let token = mint(
            "test-secret",
            json!({
                "sub": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
                "aud": "authenticated",
                "role": "authenticated",
                "email": "a@x.com",
                "exp": far_future(),
                "user_metadata": {"role": "admin"}
            }),
        );
        let claims = verifier.verify(&token).expect("token should verify");
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
        assert_eq!(claims.metadata_role().as_deref(), Some("admin"));
        assert!(claims.user_id().is_ok());
    }

    #[test]
    fn rejects_a_wrong_secret() {
        let verifier = TokenVerifier::new("right-secret");
        let token = mint(
            "wrong-secret",
            json!({
                "sub": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
                "aud": "authenticated",
                "exp": far_future()
            }),
        );
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn rejects_an_expired_token() {
        let verifier = TokenVerifier::new("test-secret");
        let token = mint(
            "test-secret",
            json!({
                "sub": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
                "aud": "authenticated",
                "exp": 946684800 // 2000-01-01
            }),
        );
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn missing_metadata_means_no_application_role() {
        let verifier = TokenVerifier::new("test-secret");
        let token = mint(
            "test-secret",
            json!({
                "sub": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
                "aud": "authenticated",
                "exp": far_future()
            }),
        );
        let claims = verifier.verify(&token).expect("token should verify");
        assert_eq!(claims.metadata_role(), None);
    }
}
