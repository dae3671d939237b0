// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use passport_kernel::AssetId;

use super::{EventRow, MirrorStore, SnapshotRow, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreOp {
    Delete,
    Insert,
    Upsert,
}

#[derive(Default)]
struct Tables {
    snapshots: BTreeMap<String, SnapshotRow>,
    events: Vec<EventRow>,
    failing: BTreeSet<(String, StoreOp)>,
    ops: Vec<(StoreOp, String)>,
}

/// In-process mirror tables with per-asset failure injection.
#[derive(Default)]
pub struct MemoryMirrorStore {
    tables: Mutex<Tables>,
}

impl MemoryMirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Every future `op` touching `asset` fails.
    pub fn fail_on(&self, asset: &AssetId, op: StoreOp) {
        self.lock().failing.insert((asset.to_string(), op));
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    pub fn snapshot(&self, asset: &AssetId) -> Option<SnapshotRow> {
        self.lock().snapshots.get(asset.as_str()).cloned()
    }

    pub fn snapshot_count(&self) -> usize {
        self.lock().snapshots.len()
    }

    /// Stored rows for `asset`, in insertion order.
    pub fn events(&self, asset: &AssetId) -> Vec<EventRow> {
        self.lock()
            .events
            .iter()
            .filter(|r| r.tire_id == asset.as_str())
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Operations in the order they were applied.
    pub fn ops(&self) -> Vec<(StoreOp, String)> {
        self.lock().ops.clone()
    }
}

impl Tables {
    fn guard(&mut self, tire_id: &str, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.contains(&(tire_id.to_string(), op)) {
            return Err(StoreError::Transport(format!("injected {:?} failure for {}", op, tire_id)));
        }
        self.ops.push((op, tire_id.to_string()));
        Ok(())
    }
}

#[async_trait]
impl MirrorStore for MemoryMirrorStore {
    async fn delete_events(&self, asset: &AssetId) -> Result<(), StoreError> {
        let mut t = self.lock();
        t.guard(asset.as_str(), StoreOp::Delete)?;
        t.events.retain(|r| r.tire_id != asset.as_str());
        Ok(())
    }

    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), StoreError> {
        let mut t = self.lock();
        for row in rows {
            t.guard(&row.tire_id, StoreOp::Insert)?;
            if t.events.iter().any(|r| r.tire_id == row.tire_id && r.seq == row.seq) {
                return Err(StoreError::Rejected {
                    status: 409,
                    body: format!("duplicate key ({}, {})", row.tire_id, row.seq),
                });
            }
        }
        t.events.extend_from_slice(rows);
        Ok(())
    }

    async fn upsert_snapshot(&self, row: &SnapshotRow) -> Result<(), StoreError> {
        let mut t = self.lock();
        t.guard(&row.tire_id, StoreOp::Upsert)?;
        t.snapshots.insert(row.tire_id.clone(), row.clone());
        Ok(())
    }
}
