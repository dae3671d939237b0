// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event stream reading.
//!
//! Strategy: full scan + in-memory predicate. The asset id is not an indexed
//! field of the history event, so every scan requests all logs matching the
//! discriminator in the range and leaves asset filtering to
//! [`passport_kernel::HistoryReconciler`]. Cost grows with total ledger
//! activity, not with one asset's history; a checkpoint narrows the range on
//! later scans without changing the result.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use passport_kernel::{BlockTimes, RawLog, ASSET_EVENT};

use crate::errors::{EngineError, Result};
use crate::ledger::{LedgerClient, LogQuery};

/// Half-open height range `[from_height, to_height)`. `None` scans to the tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanRange {
    pub from_height: u64,
    pub to_height: Option<u64>,
}

impl ScanRange {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn from_height(from_height: u64) -> Self {
        Self {
            from_height,
            to_height: None,
        }
    }

    /// Everything after a previously processed height.
    pub fn after_checkpoint(last_processed_height: Option<u64>) -> Self {
        match last_processed_height {
            Some(h) => Self::from_height(h + 1),
            None => Self::full(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_height.map_or(false, |to| to <= self.from_height)
    }
}

#[derive(Clone)]
pub struct EventStreamReader {
    ledger: Arc<dyn LedgerClient>,
    discriminator: String,
}

impl EventStreamReader {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_discriminator(ledger, ASSET_EVENT)
    }

    pub fn with_discriminator(ledger: Arc<dyn LedgerClient>, discriminator: impl Into<String>) -> Self {
        Self {
            ledger,
            discriminator: discriminator.into(),
        }
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Raw logs in `range`, in whatever order the ledger returns them.
    /// Transport failures surface as `Fetch`; nothing is retried here.
    pub async fn fetch(&self, range: ScanRange) -> Result<Vec<RawLog>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let query = LogQuery {
            discriminator: self.discriminator.clone(),
            from_height: range.from_height,
            to_height: range.to_height,
        };

        let start = Instant::now();
        let logs = self.ledger.logs(&query).await.map_err(EngineError::from_read)?;
        metrics::histogram!("passport_log_scan_duration_seconds", start.elapsed().as_secs_f64());
        tracing::debug!(
            from = range.from_height,
            to = ?range.to_height,
            count = logs.len(),
            "Scanned {} logs",
            self.discriminator
        );
        Ok(logs)
    }

    /// Block times for `heights`. Heights the ledger has no time for are
    /// left out; reconciliation falls back to the payload timestamp.
    pub async fn block_times(&self, heights: &BTreeSet<u64>) -> Result<BlockTimes> {
        let mut times = BlockTimes::new();
        for &height in heights {
            if let Some(t) = self
                .ledger
                .block_time(height)
                .await
                .map_err(EngineError::from_read)?
            {
                times.insert(height, t);
            }
        }
        Ok(times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_range_starts_after_last_height() {
        assert_eq!(ScanRange::after_checkpoint(None), ScanRange::full());
        assert_eq!(ScanRange::after_checkpoint(Some(41)).from_height, 42);
        assert!(ScanRange { from_height: 5, to_height: Some(5) }.is_empty());
        assert!(!ScanRange::from_height(5).is_empty());
    }
}
