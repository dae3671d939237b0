// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! External mirror of ledger-derived snapshots and histories.
//!
//! The mirror converges by full replacement: every write for an asset
//! deletes its stored history, inserts the whole reconciled history and
//! upserts the snapshot row. Nothing is patched incrementally.

pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use chrono::{DateTime, SecondsFormat};
use passport_kernel::{AssetEvent, AssetId, AssetSnapshot};

use crate::errors::{EngineError, Result};

pub use memory::MemoryMirrorStore;
pub use rest::RestMirrorStore;

/// Rows per bulk insert request.
pub const INSERT_CHUNK: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Transport(String),
    #[error("store rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub tire_id: String,
    pub batch_id: String,
    pub owner: String,
    pub state: u8,
    pub history_len: u64,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub tire_id: String,
    pub seq: u64,
    pub event_type: String,
    pub actor: String,
    pub offchain_hash: String,
    pub offchain_uri: String,
    pub block_time: String,
    pub tx_hash: String,
    pub raw: serde_json::Value,
}

impl SnapshotRow {
    pub fn new(snapshot: &AssetSnapshot, history: &[AssetEvent]) -> Self {
        Self {
            tire_id: snapshot.asset_id.to_string(),
            batch_id: snapshot.batch_id.to_string(),
            owner: snapshot.owner.to_string(),
            state: snapshot.state as u8,
            history_len: snapshot.history_length,
            raw: json!({ "snapshot": snapshot, "events": history }),
        }
    }
}

impl EventRow {
    pub fn new(event: &AssetEvent) -> Self {
        Self {
            tire_id: event.asset_id.to_string(),
            seq: event.sequence_no,
            event_type: event.event_type.clone(),
            actor: event.actor.to_string(),
            offchain_hash: event.offchain_hash.to_hex(),
            offchain_uri: event.offchain_uri.clone(),
            block_time: rfc3339(event.timestamp),
            tx_hash: event.tx_ref.to_string(),
            raw: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Unix seconds as RFC 3339 UTC, second precision.
pub fn rfc3339(unix_secs: u64) -> String {
    DateTime::from_timestamp(unix_secs as i64, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| unix_secs.to_string())
}

/// Tables the mirror writes to.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    async fn delete_events(&self, asset: &AssetId) -> std::result::Result<(), StoreError>;

    async fn insert_events(&self, rows: &[EventRow]) -> std::result::Result<(), StoreError>;

    /// Insert-or-update keyed by `tire_id`.
    async fn upsert_snapshot(&self, row: &SnapshotRow) -> std::result::Result<(), StoreError>;
}

#[async_trait]
impl<T: MirrorStore + ?Sized> MirrorStore for Arc<T> {
    async fn delete_events(&self, asset: &AssetId) -> std::result::Result<(), StoreError> {
        (**self).delete_events(asset).await
    }

    async fn insert_events(&self, rows: &[EventRow]) -> std::result::Result<(), StoreError> {
        (**self).insert_events(rows).await
    }

    async fn upsert_snapshot(&self, row: &SnapshotRow) -> std::result::Result<(), StoreError> {
        (**self).upsert_snapshot(row).await
    }
}

pub struct MirrorWriter<S> {
    store: S,
}

impl<S: MirrorStore> MirrorWriter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces everything stored for `asset`.
    ///
    /// Idempotent: a second call with the same inputs leaves exactly
    /// `history.len()` event rows and one snapshot row. A failure is
    /// reported as `Persistence` for this asset only.
    pub async fn replace(&self, asset: &AssetId, snapshot: &AssetSnapshot, history: &[AssetEvent]) -> Result<()> {
        if &snapshot.asset_id != asset {
            return Err(EngineError::persistence(
                asset,
                format!("snapshot belongs to {}", snapshot.asset_id),
            ));
        }

        self.store
            .delete_events(asset)
            .await
            .map_err(|e| EngineError::persistence(asset, format!("delete events: {}", e)))?;

        let rows: Vec<EventRow> = history
            .iter()
            .filter(|e| &e.asset_id == asset)
            .map(EventRow::new)
            .collect();
        for chunk in rows.chunks(INSERT_CHUNK) {
            self.store
                .insert_events(chunk)
                .await
                .map_err(|e| EngineError::persistence(asset, format!("insert events: {}", e)))?;
        }

        self.store
            .upsert_snapshot(&SnapshotRow::new(snapshot, history))
            .await
            .map_err(|e| EngineError::persistence(asset, format!("upsert snapshot: {}", e)))?;

        metrics::counter!("passport_mirrored_assets_total", 1);
        tracing::info!(asset = %asset, rows = rows.len(), "Mirrored passport");
        Ok(())
    }
}
