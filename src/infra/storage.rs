use super::supabase::{error_from_response, SupabaseCtx};
use crate::error::ApiError;

pub const AVATAR_BUCKET: &str = "avatars";

/// Avatar URLs are stored as public storage URLs; the object name is the
/// final path segment.
pub fn object_name_from_public_url(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|s| !s.is_empty())
}

pub async fn remove_avatar(ctx: &SupabaseCtx, object: &str) -> Result<(), ApiError> {
    let res = ctx
        .http
        .delete(ctx.storage_object_endpoint(AVATAR_BUCKET, object))
        .header("apikey", &ctx.service_role_key)
        .header("Authorization", ctx.service_auth_header())
        .send()
        .await?;
    if !res.status().is_success() {
        return Err(error_from_response(res).await);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_name_is_the_last_path_segment() {
        let url = "https://proj.supabase.co/storage/v1/object/public/avatars/u1-photo.png";
        assert_eq!(object_name_from_public_url(url), Some("u1-photo.png"));
    }

    #[test]
    fn bare_names_and_trailing_slashes() {
        assert_eq!(object_name_from_public_url("photo.png"), Some("photo.png"));
        assert_eq!(object_name_from_public_url("https://x/y/"), None);
        assert_eq!(object_name_from_public_url(""), None);
    }
}
