// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Materialized per-asset view as reported by the ledger.

use serde::{Deserialize, Serialize};

use crate::types::enums::LifecycleState;
use crate::types::id::{Address, AssetId, BatchId};

/// The ledger's current view of one asset.
///
/// `history_length` is the ledger's own count of recorded events. A
/// reconciled history for the same asset must have exactly this many entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    pub asset_id: AssetId,
    pub batch_id: BatchId,
    pub owner: Address,
    pub state: LifecycleState,
    pub history_length: u64,
}

impl AssetSnapshot {
    pub fn is_owned_by(&self, actor: &Address) -> bool {
        &self.owner == actor
    }

    /// True when a reconciled history of `len` entries agrees with the ledger.
    pub fn matches_history_len(&self, len: usize) -> bool {
        self.history_length == len as u64
    }
}
