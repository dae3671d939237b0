// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger event representation.
//!
//! A `RawLog` is what the ledger hands back from a log query: position,
//! transaction, event name and an undecoded payload. An `AssetEvent` is the
//! decoded, typed form.
//!
//! # Invariants
//! - Events are immutable once recorded by the ledger
//! - The ordering key is `(block_height, log_index)`, ascending
//! - `sequence_no` and `timestamp` are assigned by reconciliation, never by
//!   the decoder

use serde::{Deserialize, Serialize};

use crate::types::enums::LifecycleState;
use crate::types::id::{Address, AssetId, BatchId, OffchainHash, TxRef};

/// Discriminator of the per-asset history event emitted by the passport program.
pub const ASSET_EVENT: &str = "TyreEvent";

/// One log entry as returned by the ledger's log query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub block_height: u64,
    pub log_index: u32,
    pub tx_ref: TxRef,
    pub event_name: String,
    /// Event arguments, keyed by the event's field names.
    pub fields: serde_json::Value,
}

impl RawLog {
    pub fn position(&self) -> (u64, u32) {
        (self.block_height, self.log_index)
    }
}

/// A decoded history entry for one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEvent {
    pub asset_id: AssetId,
    pub batch_id: BatchId,
    pub event_type: String,
    pub offchain_hash: OffchainHash,
    #[serde(rename = "offchainURI")]
    pub offchain_uri: String,
    pub actor: Address,
    /// Owner recorded by the ledger right after this event.
    pub owner_after: Address,
    /// State recorded by the ledger right after this event.
    pub state_after: LifecycleState,
    /// Dense position within the asset's history, 0-based.
    pub sequence_no: u64,
    pub block_height: u64,
    pub log_index: u32,
    /// Unix seconds of the containing block.
    pub timestamp: u64,
    /// Unix seconds carried inside the event payload itself. Only used when
    /// the containing block's time is unavailable.
    pub emitted_at: u64,
    pub tx_ref: TxRef,
}

impl AssetEvent {
    pub fn position(&self) -> (u64, u32) {
        (self.block_height, self.log_index)
    }

    pub fn has_uri(&self) -> bool {
        !self.offchain_uri.is_empty()
    }
}
