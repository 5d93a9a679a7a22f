mod domain;
mod error;
mod infra;
mod middleware;
mod routes;
mod security;
mod state;

use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infra::supabase::SupabaseCtx;
use security::config::SecurityConfig;
use security::jwt::TokenVerifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let supabase = SupabaseCtx::from_env()?;
    let verifier = TokenVerifier::new(supabase.jwt_secret.clone());
    let security = SecurityConfig::from_env();
    let shared_state = state::AppState::new(supabase, verifier, security);

    let app = routes::router(shared_state)
        .route("/health", axum::routing::get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
