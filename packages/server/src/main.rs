use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use devmate_server::config::AppConfig;
use devmate_server::state::AppState;
use devmate_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("devmate_server=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("failed to connect to the database")?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_indexes(&db).await?;
    seed::seed_admin(&db, &config.admin).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;

    let app = build_router(AppState { db, config });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("DevMate API listening on http://{}", addr);
    info!("API reference at http://{}/scalar", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
