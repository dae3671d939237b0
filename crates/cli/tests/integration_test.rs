use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use passport_cli::commands::{self, batch, export, history, inspect, mirror, role, upload, write};
use passport_cli::engine::PassportEngine;
use passport_kernel::{Address, AssetId, BatchId, CommandKind, LifecycleState, OffchainHash};
use passport_node::config::NodeConfig;
use passport_node::ledger::memory::ROLE_MANUFACTURER;
use passport_node::ledger::{LedgerClient, MemoryLedger};
use passport_node::mirror::MemoryMirrorStore;
use passport_node::orchestrator::FollowUp;
use passport_node::throttle::Unthrottled;

fn addr(n: u8) -> Address {
    Address::new(format!("0x{:040x}", n))
}

fn tyre(n: usize) -> AssetId {
    AssetId::new(format!("TYRE-{:04}", n))
}

struct Harness {
    ledger: Arc<MemoryLedger>,
    store: Arc<MemoryMirrorStore>,
    engine: PassportEngine,
}

fn harness(export_dir: &std::path::Path) -> Harness {
    let ledger = Arc::new(MemoryLedger::new(addr(0xaa)));
    ledger.seed_role(&addr(1), ROLE_MANUFACTURER);
    let store = Arc::new(MemoryMirrorStore::new());

    let cfg = NodeConfig {
        export_dir: export_dir.to_path_buf(),
        retry_delay: Duration::ZERO,
        ..NodeConfig::default()
    };
    let engine = PassportEngine::with_ledger(cfg, "0xprogram", ledger.clone())
        .with_store(store.clone())
        .with_throttle(Arc::new(Unthrottled::new()));
    Harness { ledger, store, engine }
}

async fn mint_three(h: &Harness) {
    let assets = (1..=3).map(tyre).collect();
    write::mint_batch(&h.engine, addr(1), BatchId::new("BATCH-A"), assets)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_single_writes_and_reads() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    mint_three(&h).await;

    write::record_event(
        &h.engine,
        addr(1),
        tyre(1),
        "QC_PASSED".into(),
        OffchainHash::of_document(b"qc report"),
        "ipfs://qc".into(),
    )
    .await
    .unwrap();
    write::transfer(&h.engine, addr(1), tyre(1), addr(2)).await.unwrap();

    let snap = h.ledger.snapshot(&tyre(1)).await.unwrap();
    assert_eq!(snap.owner, addr(2));
    assert_eq!(snap.history_length, 3);

    // The manufacturer no longer owns it, so the dry-run stops the write.
    let result = write::set_state(&h.engine, addr(1), tyre(1), LifecycleState::InService).await;
    assert!(result.is_err());
    assert_eq!(h.ledger.sequence_of(&addr(1)), 3);

    inspect::snapshot(&h.engine, &tyre(1)).await.unwrap();
    inspect::batch(&h.engine, &BatchId::new("BATCH-A")).await.unwrap();
    inspect::owners(&h.engine, &BatchId::new("BATCH-A")).await.unwrap();
    role::run(&h.engine, &addr(1)).await.unwrap();
    history::run(&h.engine, &tyre(1), true).await.unwrap();
    assert!(dir.path().join("history_TYRE-0001.csv").exists());
}

#[tokio::test]
async fn test_mint_batch_needs_assets() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    let result = write::mint_batch(&h.engine, addr(1), BatchId::new("BATCH-A"), vec![]).await;
    assert!(result.is_err());
    assert!(h.ledger.submissions().is_empty());
}

#[tokio::test]
async fn test_register_roles_share_one_context() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    let roles = vec![(addr(2), "Distributor".to_string()), (addr(3), "Retailer".to_string())];
    write::register_roles(&h.engine, addr(0xaa), roles).await.unwrap();

    assert_eq!(h.ledger.role(&addr(2)).await.unwrap(), "Distributor");
    assert_eq!(h.ledger.role(&addr(3)).await.unwrap(), "Retailer");
    let sequences: Vec<u64> = h.ledger.submissions().iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![0, 1]);
}

#[tokio::test]
async fn test_batch_transfer_skips_foreign_tyres() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    mint_three(&h).await;
    write::transfer(&h.engine, addr(1), tyre(2), addr(3)).await.unwrap();

    let report = batch::transfer(&h.engine, addr(1), BatchId::new("BATCH-A"), addr(2))
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.skipped(), 1);
    assert!(report.outcome(&tyre(2)).unwrap().is_skipped());

    // Every processed tyre is mirrored, the skipped one included.
    assert_eq!(h.store.snapshot_count(), 3);
    assert_eq!(h.store.snapshot(&tyre(1)).unwrap().owner, addr(2).to_string());
}

#[tokio::test]
async fn test_batch_state_with_follow_up() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    mint_three(&h).await;

    let follow_up = FollowUp {
        event_type: "DISPATCH_NOTE".into(),
        offchain_hash: OffchainHash::of_document(b"note"),
        offchain_uri: "ipfs://note".into(),
    };
    let report = batch::set_state(
        &h.engine,
        addr(1),
        BatchId::new("BATCH-A"),
        LifecycleState::InMarket,
        Some(follow_up),
    )
    .await
    .unwrap();
    assert_eq!(report.succeeded(), 3);
    for n in 1..=3 {
        let outcome = report.outcome(&tyre(n)).unwrap();
        assert!(matches!(outcome.follow_up, Some(Ok(_))));
        assert_eq!(h.store.events(&tyre(n)).len(), 3);
    }
}

#[tokio::test]
async fn test_batch_record_by_non_owner_skips_everything() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    mint_three(&h).await;
    let dry_runs = h.ledger.simulations().len();

    let report = batch::record(
        &h.engine,
        addr(2),
        BatchId::new("BATCH-A"),
        "GRN".into(),
        OffchainHash::ZERO,
        String::new(),
    )
    .await
    .unwrap();
    assert_eq!(report.skipped(), 3);
    // Ineligible tyres never reach the dry-run.
    assert_eq!(h.ledger.simulations().len(), dry_runs);
    assert!(h
        .ledger
        .simulations()
        .iter()
        .all(|(_, cmd)| cmd.kind() != CommandKind::RecordEvent));
}

#[tokio::test]
async fn test_export_and_mirror_commands() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    mint_three(&h).await;

    export::asset(&h.engine, &tyre(1)).await.unwrap();
    assert!(dir.path().join("passport_TYRE-0001.json").exists());
    assert!(dir.path().join("history_TYRE-0001.csv").exists());

    export::batch(&h.engine, &BatchId::new("BATCH-A")).await.unwrap();
    let index = std::fs::read_to_string(dir.path().join("batch_BATCH-A.json")).unwrap();
    let index: serde_json::Value = serde_json::from_str(&index).unwrap();
    assert_eq!(index["assets"].as_array().unwrap().len(), 3);

    mirror::asset(&h.engine, &tyre(1)).await.unwrap();
    assert_eq!(h.store.snapshot_count(), 1);
    mirror::batch(&h.engine, &BatchId::new("BATCH-A")).await.unwrap();
    assert_eq!(h.store.snapshot_count(), 3);
    assert_eq!(h.store.event_count(), 3);
}

#[tokio::test]
async fn test_upload_without_webhook_config_fails() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path());
    let file = dir.path().join("doc.json");
    std::fs::write(&file, br#"{"ok":true}"#).unwrap();

    let result = upload::run(&h.engine, &file, None).await;
    assert!(result.is_err());
}

#[test]
fn test_parse_role_pair() {
    let (address, role) = write::parse_role_pair(&format!("{}=Distributor", addr(2))).unwrap();
    assert_eq!(address, addr(2));
    assert_eq!(role, "Distributor");

    assert!(write::parse_role_pair("Distributor").is_err());
    assert!(write::parse_role_pair(&format!("{}= ", addr(2))).is_err());
}

#[test]
fn test_offchain_hash_sources() {
    let dir = tempdir().unwrap();
    let doc = dir.path().join("grn.pdf");
    std::fs::write(&doc, b"goods received").unwrap();

    let from_file = commands::offchain_hash(None, Some(&doc)).unwrap();
    assert_eq!(from_file, OffchainHash::of_document(b"goods received"));
    assert_eq!(commands::offchain_hash(None, None).unwrap(), OffchainHash::ZERO);
    assert!(commands::offchain_hash(Some("0xzz"), None).is_err());
}
