use std::sync::Arc;

use crate::infra::supabase::SupabaseCtx;
use crate::security::config::SecurityConfig;
use crate::security::jwt::TokenVerifier;

/// Shared context, passed explicitly to every handler. There is no
/// ambient client singleton; the caller's own token travels with the
/// request.
#[derive(Clone)]
pub struct AppState {
    pub supabase: SupabaseCtx,
    pub verifier: TokenVerifier,
    pub security: SecurityConfig,
}

impl AppState {
    pub fn new(
        supabase: SupabaseCtx,
        verifier: TokenVerifier,
        security: SecurityConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            supabase,
            verifier,
            security,
        })
    }
}
