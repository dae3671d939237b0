mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use passport_kernel::{AssetEvent, AssetId, AssetSnapshot, LifecycleState, OffchainHash, TxRef};
use passport_node::errors::EngineError;
use passport_node::ledger::LedgerClient;
use passport_node::mirror::memory::StoreOp;
use passport_node::mirror::{
    EventRow, MemoryMirrorStore, MirrorStore, MirrorWriter, SnapshotRow, StoreError, INSERT_CHUNK,
};
use passport_node::sync::{Checkpoint, HistorySync};

use support::*;

fn event(asset: &AssetId, seq: u64) -> AssetEvent {
    AssetEvent {
        asset_id: asset.clone(),
        batch_id: batch(),
        event_type: "INSPECTION".into(),
        offchain_hash: OffchainHash::ZERO,
        offchain_uri: String::new(),
        actor: manufacturer(),
        owner_after: manufacturer(),
        state_after: LifecycleState::Manufactured,
        sequence_no: seq,
        block_height: seq + 1,
        log_index: 0,
        timestamp: 1_762_300_800 + seq,
        emitted_at: 1_762_300_800 + seq,
        tx_ref: TxRef::new(format!("0x{:02x}", seq)),
    }
}

fn snapshot(asset: &AssetId, len: u64) -> AssetSnapshot {
    AssetSnapshot {
        asset_id: asset.clone(),
        batch_id: batch(),
        owner: manufacturer(),
        state: LifecycleState::Manufactured,
        history_length: len,
    }
}

#[tokio::test]
async fn replace_twice_leaves_one_copy() {
    let writer = MirrorWriter::new(MemoryMirrorStore::new());
    let asset = tyre(1);
    let history: Vec<_> = (0..4).map(|i| event(&asset, i)).collect();

    writer.replace(&asset, &snapshot(&asset, 4), &history).await.unwrap();
    writer.replace(&asset, &snapshot(&asset, 4), &history).await.unwrap();

    let store = writer.store();
    assert_eq!(store.events(&asset).len(), 4);
    assert_eq!(store.event_count(), 4);
    assert_eq!(store.snapshot_count(), 1);
    assert_eq!(store.snapshot(&asset).unwrap().history_len, 4);
}

#[tokio::test]
async fn shorter_history_leaves_no_stale_rows() {
    let writer = MirrorWriter::new(MemoryMirrorStore::new());
    let asset = tyre(1);
    let long: Vec<_> = (0..6).map(|i| event(&asset, i)).collect();

    writer.replace(&asset, &snapshot(&asset, 6), &long).await.unwrap();
    writer.replace(&asset, &snapshot(&asset, 2), &long[..2]).await.unwrap();

    let seqs: Vec<u64> = writer.store().events(&asset).iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![0, 1]);
}

#[tokio::test]
async fn writes_run_delete_insert_upsert() {
    let writer = MirrorWriter::new(MemoryMirrorStore::new());
    let asset = tyre(1);
    writer.replace(&asset, &snapshot(&asset, 1), &[event(&asset, 0)]).await.unwrap();

    let ops: Vec<StoreOp> = writer.store().ops().into_iter().map(|(op, _)| op).collect();
    assert_eq!(ops, vec![StoreOp::Delete, StoreOp::Insert, StoreOp::Upsert]);
}

#[tokio::test]
async fn failed_insert_is_a_persistence_error_for_that_asset() {
    let store = MemoryMirrorStore::new();
    store.fail_on(&tyre(1), StoreOp::Insert);
    let writer = MirrorWriter::new(store);
    let asset = tyre(1);

    let err = writer
        .replace(&asset, &snapshot(&asset, 1), &[event(&asset, 0)])
        .await
        .unwrap_err();
    match err {
        EngineError::Persistence { asset: failed, .. } => assert_eq!(failed, asset),
        other => panic!("unexpected error: {other}"),
    }
    assert!(writer.store().snapshot(&asset).is_none());
}

#[tokio::test]
async fn one_failing_asset_does_not_block_the_batch() {
    let ledger = minted(3);
    record(&ledger, &manufacturer(), &tyre(2), "QC_PASSED");
    let client: Arc<dyn LedgerClient> = ledger.clone();
    let sync = HistorySync::new(client);

    let store = MemoryMirrorStore::new();
    store.fail_on(&tyre(2), StoreOp::Upsert);
    let writer = MirrorWriter::new(store);

    let outcomes = sync
        .mirror_batch(&writer, &batch(), &mut Checkpoint::default())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[1].result, Err(EngineError::Persistence { .. })));
    assert!(outcomes[0].result.is_ok() && outcomes[2].result.is_ok());
    assert!(writer.store().snapshot(&tyre(1)).is_some());
    assert!(writer.store().snapshot(&tyre(3)).is_some());
    assert!(writer.store().snapshot(&tyre(2)).is_none());

    // A later run converges once the store recovers.
    writer.store().clear_failures();
    sync.mirror_batch(&writer, &batch(), &mut Checkpoint::default())
        .await
        .unwrap();
    assert_eq!(writer.store().events(&tyre(2)).len(), 2);
    assert_eq!(writer.store().event_count(), 4);
}

#[derive(Default)]
struct CountingStore {
    inserts: AtomicUsize,
    rows: AtomicUsize,
}

#[async_trait]
impl MirrorStore for CountingStore {
    async fn delete_events(&self, _asset: &AssetId) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_events(&self, rows: &[EventRow]) -> Result<(), StoreError> {
        assert!(rows.len() <= INSERT_CHUNK);
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.rows.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_snapshot(&self, _row: &SnapshotRow) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn long_histories_are_inserted_in_chunks() {
    let writer = MirrorWriter::new(CountingStore::default());
    let asset = tyre(1);
    let history: Vec<_> = (0..1_201).map(|i| event(&asset, i)).collect();

    writer.replace(&asset, &snapshot(&asset, 1_201), &history).await.unwrap();

    assert_eq!(writer.store().inserts.load(Ordering::SeqCst), 3);
    assert_eq!(writer.store().rows.load(Ordering::SeqCst), 1_201);
}
