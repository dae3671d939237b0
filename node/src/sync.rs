// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger → history reconciliation → mirror.
//!
//! One log scan serves a whole set of assets; each asset is then reconciled
//! and mirrored on its own, so a failure on one never stops the others.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use passport_kernel::{
    verify, AssetEvent, AssetId, AssetSnapshot, BatchId, EventDecoder, HistoryReconciler,
};

use crate::errors::{EngineError, Result};
use crate::ledger::LedgerClient;
use crate::mirror::{MirrorStore, MirrorWriter};
use crate::snapshot::SnapshotReader;
use crate::stream::{EventStreamReader, ScanRange};

/// Snapshot plus canonical history of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledPassport {
    pub snapshot: AssetSnapshot,
    pub history: Vec<AssetEvent>,
    /// Set when the reconciled history disagrees with the ledger's own count.
    pub length_mismatch: Option<LengthMismatch>,
    /// Hex BLAKE3 digest of `history`.
    pub digest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthMismatch {
    pub ledger: u64,
    pub reconciled: usize,
}

impl ReconciledPassport {
    pub fn new(snapshot: AssetSnapshot, history: Vec<AssetEvent>) -> Self {
        let length_mismatch = if snapshot.matches_history_len(history.len()) {
            None
        } else {
            Some(LengthMismatch {
                ledger: snapshot.history_length,
                reconciled: history.len(),
            })
        };
        let digest = verify::history_digest_hex(&history);
        Self {
            snapshot,
            history,
            length_mismatch,
            digest,
        }
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.snapshot.asset_id
    }
}

/// Where a previous scan stopped, and what it had reconciled by then.
///
/// Passed explicitly through each cycle; nothing about it is global.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub last_processed_height: Option<u64>,
    pub histories: BTreeMap<AssetId, Vec<AssetEvent>>,
}

impl Checkpoint {
    pub fn history(&self, asset: &AssetId) -> Option<&[AssetEvent]> {
        self.histories.get(asset).map(Vec::as_slice)
    }

    /// True when every asset in `assets` was reconciled by an earlier scan,
    /// so the next one can start after `last_processed_height`.
    pub fn covers(&self, assets: &[AssetId]) -> bool {
        self.last_processed_height.is_some() && assets.iter().all(|a| self.histories.contains_key(a))
    }

    /// Scan range that picks up where this checkpoint left off for `assets`.
    /// An asset the checkpoint has never seen forces a full scan.
    pub fn range_for(&self, assets: &[AssetId]) -> ScanRange {
        if self.covers(assets) {
            ScanRange::after_checkpoint(self.last_processed_height)
        } else {
            ScanRange::full()
        }
    }
}

/// Per-asset result of a sync pass.
#[derive(Debug)]
pub struct SyncOutcome {
    pub asset_id: AssetId,
    pub result: Result<ReconciledPassport>,
}

#[derive(Clone)]
pub struct HistorySync {
    stream: EventStreamReader,
    snapshots: SnapshotReader,
    decoder: EventDecoder,
    ledger: Arc<dyn LedgerClient>,
    start_height: u64,
}

impl HistorySync {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            stream: EventStreamReader::new(ledger.clone()),
            snapshots: SnapshotReader::new(ledger.clone()),
            decoder: EventDecoder::default(),
            ledger,
            start_height: 0,
        }
    }

    /// Never scan below `height`, e.g. the program's deployment block.
    pub fn with_start_height(mut self, height: u64) -> Self {
        self.start_height = height;
        self
    }

    pub fn snapshots(&self) -> &SnapshotReader {
        &self.snapshots
    }

    /// Full-scan reconciliation of a single asset.
    pub async fn passport(&self, asset: &AssetId) -> Result<ReconciledPassport> {
        let mut checkpoint = Checkpoint::default();
        let mut outcomes = self.reconcile(std::slice::from_ref(asset), &mut checkpoint).await?;
        match outcomes.pop() {
            Some(outcome) => outcome.result,
            None => Err(EngineError::config("reconciliation produced no outcome")),
        }
    }

    /// Reconciles every asset of `batch`, advancing `checkpoint`.
    pub async fn batch(&self, batch: &BatchId, checkpoint: &mut Checkpoint) -> Result<Vec<SyncOutcome>> {
        let members = self.snapshots.batch_members(batch).await?;
        self.reconcile(&members, checkpoint).await
    }

    /// One scan from the checkpoint up to the current tip, then per-asset
    /// reconciliation. The outer `Err` means the scan itself failed and
    /// `checkpoint` is untouched.
    pub async fn reconcile(&self, assets: &[AssetId], checkpoint: &mut Checkpoint) -> Result<Vec<SyncOutcome>> {
        let start = Instant::now();
        let tip = self
            .ledger
            .latest_height()
            .await
            .map_err(EngineError::from_read)?;
        let incremental = checkpoint.covers(assets);
        let mut range = checkpoint.range_for(assets);
        range.from_height = range.from_height.max(self.start_height);
        range.to_height = Some(tip + 1);

        let raw = self.stream.fetch(range).await?;
        let decoded = self.decoder.decode_all(raw.iter());
        for ((height, index), err) in &decoded.skipped {
            metrics::counter!("passport_decode_skipped_total", 1);
            tracing::warn!(height, index, "Skipping undecodable log: {}", err);
        }

        let wanted: BTreeSet<&AssetId> = assets.iter().collect();
        let mut heights = BTreeSet::new();
        for asset in &wanted {
            heights.extend(HistoryReconciler::heights_for(&decoded.events, asset));
        }
        let mut times = self.stream.block_times(&heights).await?;

        let mut histories = BTreeMap::new();
        for asset in &wanted {
            let prior = if incremental {
                checkpoint.histories.get(*asset).cloned().unwrap_or_default()
            } else {
                Vec::new()
            };
            // Prior events keep the block times they were reconciled with.
            for e in &prior {
                if !times.contains(e.block_height) {
                    times.insert(e.block_height, e.timestamp);
                }
            }
            let history = HistoryReconciler::merge(prior, decoded.events.clone(), asset, &times);
            histories.insert((*asset).clone(), history);
        }

        let mut outcomes = Vec::with_capacity(assets.len());
        for asset in assets {
            let history = histories.get(asset).cloned().unwrap_or_default();
            let result = self.snapshots.snapshot(asset).await.map(|snapshot| {
                let passport = ReconciledPassport::new(snapshot, history);
                if let Some(m) = passport.length_mismatch {
                    tracing::warn!(
                        asset = %asset,
                        ledger = m.ledger,
                        reconciled = m.reconciled,
                        "History length differs from ledger count"
                    );
                }
                passport
            });
            outcomes.push(SyncOutcome {
                asset_id: asset.clone(),
                result,
            });
        }

        checkpoint.last_processed_height = Some(tip);
        checkpoint.histories.extend(histories);
        metrics::histogram!("passport_reconcile_duration_seconds", start.elapsed().as_secs_f64());
        Ok(outcomes)
    }

    /// Reconciles `assets` and replaces each one's mirror copy. Mirroring
    /// failures stay on the asset they happened to.
    pub async fn mirror<S: MirrorStore>(
        &self,
        writer: &MirrorWriter<S>,
        assets: &[AssetId],
        checkpoint: &mut Checkpoint,
    ) -> Result<Vec<SyncOutcome>> {
        let mut outcomes = self.reconcile(assets, checkpoint).await?;
        for outcome in &mut outcomes {
            let mirrored = match &outcome.result {
                Ok(p) => writer.replace(&outcome.asset_id, &p.snapshot, &p.history).await,
                Err(_) => continue,
            };
            if let Err(e) = mirrored {
                tracing::error!(asset = %outcome.asset_id, "Mirror write failed: {}", e);
                outcome.result = Err(e);
            }
        }
        Ok(outcomes)
    }

    pub async fn mirror_batch<S: MirrorStore>(
        &self,
        writer: &MirrorWriter<S>,
        batch: &BatchId,
        checkpoint: &mut Checkpoint,
    ) -> Result<Vec<SyncOutcome>> {
        let members = self.snapshots.batch_members(batch).await?;
        self.mirror(writer, &members, checkpoint).await
    }
}
