use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;

use billforge_api::app::{AppServices, build_app};
use billforge_api::config::AppConfig;
use billforge_auth::Hs256Jwt;
use billforge_infra::{Repositories, create_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    billforge_observability::init(config.log_format);

    if config.jwt_secret_is_default {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let repos = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await.context("failed to connect to Postgres")?;
            run_migrations(&pool).await.context("failed to run migrations")?;
            tracing::info!("using Postgres storage");
            Repositories::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; data is kept in memory and lost on restart");
            Repositories::in_memory()
        }
    };

    let jwt = Hs256Jwt::new(config.jwt_secret.expose_secret().as_bytes(), config.jwt_ttl);
    let services = Arc::new(AppServices::new(repos, jwt, config.cookie_secure));
    let app = build_app(services, config.cors_allow_origin.clone());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
