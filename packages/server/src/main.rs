use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::LanguageRegistry;
use judge::{DbStore, LeaseManager, Store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use server::auth::JwtAuthClient;
use server::config::AppConfig;
use server::requeue::run_stale_lease_sweeper;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let langs = Arc::new(
        LanguageRegistry::load(&config.langs.path).context("Failed to load language registry")?,
    );
    info!(languages = langs.list().len(), "Language registry loaded");

    let store: Arc<dyn Store> = Arc::new(
        DbStore::connect(&config.database)
            .await
            .context("Failed to connect to database")?,
    );

    tokio::spawn(run_stale_lease_sweeper(
        LeaseManager::new(store.clone(), &config.lease),
        Duration::from_secs(config.lease.sweep_interval_secs.max(1)),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        store,
        langs,
        auth: Arc::new(JwtAuthClient::new(&config.auth.jwt_secret)),
        config,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
