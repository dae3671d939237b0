// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Periodic mirror daemon: reconciles the configured batches and replaces
//! their mirror copies on every tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use passport_node::config::NodeConfig;
use passport_node::errors::{EngineError, Result};
use passport_node::ledger::{LedgerClient, RpcLedger};
use passport_node::mirror::{MirrorWriter, RestMirrorStore};
use passport_node::sync::{Checkpoint, HistorySync};
use passport_node::telemetry;

#[tokio::main]
async fn main() {
    telemetry::init_telemetry();

    if let Err(e) = run().await {
        tracing::error!("passport-node stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cfg = NodeConfig::from_env()?;
    let program = cfg.require_program()?;
    let (store_url, store_key) = cfg.require_store()?;
    if cfg.sync_batches.is_empty() {
        return Err(EngineError::config("PASSPORT_SYNC_BATCHES is empty"));
    }

    tracing::info!(
        rpc = %cfg.rpc_url,
        program,
        batches = cfg.sync_batches.len(),
        interval_secs = cfg.sync_interval.as_secs(),
        "Starting passport mirror"
    );

    let ledger: Arc<dyn LedgerClient> = Arc::new(
        RpcLedger::new(&cfg.rpc_url, program, cfg.request_timeout)
            .map_err(EngineError::from_read)?,
    );
    ledger
        .resolve_program()
        .await
        .map_err(EngineError::from_read)?;

    let store = RestMirrorStore::new(store_url, store_key, cfg.request_timeout)
        .map_err(|e| EngineError::config(e.to_string()))?;
    let writer = MirrorWriter::new(store);
    let sync = HistorySync::new(ledger).with_start_height(cfg.start_height);

    let mut checkpoints: BTreeMap<_, Checkpoint> = BTreeMap::new();
    let mut interval = tokio::time::interval(cfg.sync_interval);
    loop {
        interval.tick().await;
        for batch in &cfg.sync_batches {
            let checkpoint = checkpoints.entry(batch.clone()).or_default();
            match sync.mirror_batch(&writer, batch, checkpoint).await {
                Ok(outcomes) => {
                    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
                    tracing::info!(
                        batch = %batch,
                        assets = outcomes.len(),
                        failed,
                        height = ?checkpoint.last_processed_height,
                        "Mirror cycle done"
                    );
                }
                // Keep the old checkpoint; the next tick rescans from it.
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::error!(batch = %batch, "Mirror cycle failed: {}", e),
            }
        }
    }
}
