use cookie::SameSite;
use tracing::warn;

/// Cookie settings for the session cookies set on login. The SPA also
/// receives the tokens in the response body; the cookies exist so
/// server-gated pages work without client-side token plumbing.
#[derive(Clone)]
pub struct SecurityConfig {
    pub access_cookie_name: String,
    pub refresh_cookie_name: String,
    pub secure_cookies: bool,
    pub same_site: SameSite,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        let access_cookie_name =
            env_string("ACCESS_COOKIE_NAME").unwrap_or_else(|| "access_token".into());
        let refresh_cookie_name =
            env_string("REFRESH_COOKIE_NAME").unwrap_or_else(|| "refresh_token".into());

        let mut secure_cookies = env_string("COOKIE_SECURE")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        let same_site = env_string("COOKIE_SAMESITE")
            .and_then(|v| parse_same_site(&v))
            .unwrap_or(SameSite::Lax);

        if same_site == SameSite::None && !secure_cookies {
            warn!("SameSite=None requires secure cookies; forcing COOKIE_SECURE=true");
            secure_cookies = true;
        }

        SecurityConfig {
            access_cookie_name,
            refresh_cookie_name,
            secure_cookies,
            same_site,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_same_site(value: &str) -> Option<SameSite> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" => Some(SameSite::None),
        "lax" => Some(SameSite::Lax),
        "strict" => Some(SameSite::Strict),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn same_site_parsing() {
        assert_eq!(parse_same_site("strict"), Some(SameSite::Strict));
        assert_eq!(parse_same_site("Lax"), Some(SameSite::Lax));
        assert_eq!(parse_same_site("none"), Some(SameSite::None));
        assert_eq!(parse_same_site("other"), None);
    }
}
