// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Tracing
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "passport_node=debug,passport_cli=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    // 2. Prometheus recorder
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => {
            tracing::warn!("Metrics recorder not installed: {}", e);
            return;
        }
    }

    metrics::describe_counter!("passport_submissions_total", "Mutating calls sent to the ledger");
    metrics::describe_counter!("passport_submission_retries_total", "Retries after a sequence conflict");
    metrics::describe_counter!("passport_submission_failures_total", "Submissions that ended in failure");
    metrics::describe_counter!("passport_batch_skipped_total", "Batch assets skipped");
    metrics::describe_counter!("passport_batch_failed_total", "Batch assets failed");
    metrics::describe_counter!("passport_mirrored_assets_total", "Assets replaced in the mirror");
    metrics::describe_counter!("passport_decode_skipped_total", "Log entries skipped as undecodable");
    metrics::describe_histogram!("passport_reconcile_duration_seconds", "Time to scan and reconcile a set of assets");
    metrics::describe_histogram!("passport_log_scan_duration_seconds", "Time for one log query");
    metrics::describe_histogram!("passport_submit_duration_seconds", "Time from first attempt to durable acceptance");

    metrics::gauge!("passport_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
