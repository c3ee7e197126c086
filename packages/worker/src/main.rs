use std::sync::Arc;

use anyhow::Context;
use common::LanguageRegistry;
use judge::{DbStore, LeaseManager, PollConfig, Store};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use worker::WorkerError;
use worker::config::WorkerAppConfig;
use worker::models::{FsTestCaseSource, JudgeExecutor, ProcessSandbox, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    let (langs, store) = bootstrap(&config)
        .await
        .context("Failed to initialize worker")?;

    let executor = Arc::new(JudgeExecutor::new(
        Arc::new(ProcessSandbox),
        Arc::new(FsTestCaseSource::new(
            &config.worker.testdata_root,
            config.worker.cache_size,
        )),
        config.exec.clone(),
        &config.worker.workdir,
    ));

    info!(
        testdata_root = %config.worker.testdata_root,
        languages = langs.list().len(),
        lease_ttl_secs = config.lease.ttl_secs,
        heartbeat_interval_secs = config.lease.heartbeat_interval_secs,
        "Worker ready"
    );

    let runner = Runner::new(
        config.worker.id.clone(),
        LeaseManager::new(store, &config.lease),
        langs,
        executor,
        config.heartbeat_interval(),
        PollConfig {
            base_ms: config.worker.poll_base_ms,
            max_ms: config.worker.poll_max_ms,
        },
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown requested, finishing current pass");
        shutdown.cancel();
    });

    runner.run(cancel).await;
    Ok(())
}

async fn bootstrap(
    config: &WorkerAppConfig,
) -> Result<(Arc<LanguageRegistry>, Arc<dyn Store>), WorkerError> {
    let langs = LanguageRegistry::load(&config.worker.langs_path)?;
    let store = DbStore::connect(&config.database).await?;
    Ok((Arc::new(langs), Arc::new(store)))
}
