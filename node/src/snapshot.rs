// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use passport_kernel::{Address, AssetId, AssetSnapshot, BatchId};

use crate::errors::{EngineError, Result};
use crate::ledger::LedgerClient;

/// Read side of the ledger's materialized state.
#[derive(Clone)]
pub struct SnapshotReader {
    ledger: Arc<dyn LedgerClient>,
}

impl SnapshotReader {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    pub async fn snapshot(&self, asset: &AssetId) -> Result<AssetSnapshot> {
        self.ledger.snapshot(asset).await.map_err(EngineError::from_read)
    }

    pub async fn batch_members(&self, batch: &BatchId) -> Result<Vec<AssetId>> {
        self.ledger
            .batch_members(batch)
            .await
            .map_err(EngineError::from_read)
    }

    /// `None` when no role is registered for `address`.
    pub async fn role(&self, address: &Address) -> Result<Option<String>> {
        let role = self.ledger.role(address).await.map_err(EngineError::from_read)?;
        Ok(if role.is_empty() { None } else { Some(role) })
    }
}
