use std::future::Future;

use log::*;
use order_etl_engine::{AnalyticsStore, BulkSummary, ClickHouseStore, EtlPipeline};

use crate::{config::EtlConfig, errors::ServiceError};

/// Connect to ClickHouse and run the pipeline until Ctrl-C is received (or, in one-shot mode, until the existing files
/// have been loaded).
pub async fn run_service(config: EtlConfig) -> Result<(), ServiceError> {
    config.validate()?;
    let store = ClickHouseStore::new(config.store.clickhouse_config());
    store.ensure_schema().await.map_err(|e| ServiceError::InitializeError(e.to_string()))?;
    run_pipeline(store, &config, shutdown_signal()).await
}

/// Run the pipeline against any store.
///
/// In one-shot mode (`watch == false`) this performs the bulk pass and returns, and a failing load is an error. In
/// watch mode it runs the bulk pass, starts the live loop, and waits for `shutdown` before stopping the pipeline.
pub async fn run_pipeline<B, S>(store: B, config: &EtlConfig, shutdown: S) -> Result<(), ServiceError>
where
    B: AnalyticsStore + 'static,
    S: Future<Output = ()>,
{
    let pipeline = EtlPipeline::in_memory(store, config.pipeline_config())?;
    if !config.watch {
        let summary: BulkSummary = pipeline.run_bulk_pass().await?;
        info!("🚀️ One-shot run complete. {summary}");
        return Ok(());
    }
    pipeline.run().await?;
    info!("🚀️ Watching {} for new files. Press Ctrl-C to stop.", config.data_dir.display());
    shutdown.await;
    info!("🚀️ Shutting down");
    pipeline.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("🚀️ Could not listen for Ctrl-C. Shutting down immediately. {e}");
    }
}
