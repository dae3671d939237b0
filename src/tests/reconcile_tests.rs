use serde_json::json;

use crate::decode::EventDecoder;
use crate::event::AssetEvent;
use crate::reconcile::{BlockTimes, HistoryReconciler};
use crate::tests::support::tyre_log;
use crate::types::id::AssetId;
use crate::verify::history_digest;

fn decode(logs: &[crate::event::RawLog]) -> Vec<AssetEvent> {
    EventDecoder::default().decode_all(logs).events
}

#[test]
fn test_five_events_across_sparse_heights() {
    // Returned out of order, interleaved with another tyre's events.
    let logs = vec![
        tyre_log("TIREB01", 40, 0, "STATE_IN_SERVICE"),
        tyre_log("TIREB02", 3, 0, "MINTED"),
        tyre_log("TIREB01", 3, 1, "MINTED"),
        tyre_log("TIREB01", 17, 2, "RECEIVED_FROM_MANUFACTURER"),
        tyre_log("TIREB01", 17, 0, "SHIPPED_TO_DISTRIBUTOR"),
        tyre_log("TIREB01", 95, 4, "RETREAD"),
    ];
    let target = AssetId::new("TIREB01");
    let history = HistoryReconciler::reconcile(decode(&logs), &target, &BlockTimes::new());

    assert_eq!(history.len(), 5);
    let positions: Vec<_> = history.iter().map(|e| e.position()).collect();
    assert_eq!(positions, vec![(3, 1), (17, 0), (17, 2), (40, 0), (95, 4)]);
    let seqs: Vec<_> = history.iter().map(|e| e.sequence_no).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    assert!(history.iter().all(|e| e.asset_id == target));
}

#[test]
fn test_timestamps_come_from_blocks() {
    let logs = vec![tyre_log("TIREB01", 7, 0, "MINTED"), tyre_log("TIREB01", 9, 0, "RETREAD")];
    let times: BlockTimes = [(7u64, 1_762_300_000u64)].into_iter().collect();
    let history = HistoryReconciler::reconcile(decode(&logs), &AssetId::new("TIREB01"), &times);

    assert_eq!(history[0].timestamp, 1_762_300_000);
    // No block time on record: fall back to the payload timestamp.
    assert_eq!(history[1].timestamp, history[1].emitted_at);
}

#[test]
fn test_duplicate_logs_collapse() {
    let logs = vec![
        tyre_log("TIREB01", 2, 0, "MINTED"),
        tyre_log("TIREB01", 2, 0, "MINTED"),
        tyre_log("TIREB01", 4, 0, "RETREAD"),
    ];
    let history = HistoryReconciler::reconcile(decode(&logs), &AssetId::new("TIREB01"), &BlockTimes::new());
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].sequence_no, 1);
}

#[test]
fn test_conflicting_copies_resolve_independent_of_fetch_order() {
    let a = tyre_log("TIREB01", 5, 0, "RETREAD");
    let mut b = a.clone();
    b.fields["offchainURI"] = json!("ipfs://other.pdf");
    let target = AssetId::new("TIREB01");
    let times = BlockTimes::new();

    let forward = HistoryReconciler::reconcile(decode(&[a.clone(), b.clone()]), &target, &times);
    let backward = HistoryReconciler::reconcile(decode(&[b, a]), &target, &times);
    assert_eq!(forward.len(), 1);
    assert_eq!(forward, backward);
    assert_eq!(forward[0].offchain_uri, "ipfs://other.pdf");
    assert_eq!(history_digest(&forward), history_digest(&backward));
}

#[test]
fn test_unknown_asset_yields_empty_history() {
    let logs = vec![tyre_log("TIREB01", 2, 0, "MINTED")];
    let history = HistoryReconciler::reconcile(decode(&logs), &AssetId::new("TIREZ99"), &BlockTimes::new());
    assert!(history.is_empty());
    assert_eq!(HistoryReconciler::last_height(&history), None);
}

#[test]
fn test_incremental_merge_matches_full_scan() {
    let early = vec![tyre_log("TIREB01", 2, 0, "MINTED"), tyre_log("TIREB01", 8, 1, "SHIPPED")];
    let late = vec![
        // Overlaps the checkpoint by one block on purpose.
        tyre_log("TIREB01", 8, 1, "SHIPPED"),
        tyre_log("TIREB01", 11, 0, "RECEIVED"),
    ];
    let target = AssetId::new("TIREB01");
    let times = BlockTimes::new();

    let prior = HistoryReconciler::reconcile(decode(&early), &target, &times);
    assert_eq!(HistoryReconciler::last_height(&prior), Some(8));
    let merged = HistoryReconciler::merge(prior, decode(&late), &target, &times);

    let mut all = early.clone();
    all.extend(late);
    let full = HistoryReconciler::reconcile(decode(&all), &target, &times);
    assert_eq!(merged, full);
    assert_eq!(merged.len(), 3);
}

#[test]
fn test_heights_for_only_target() {
    let logs = vec![
        tyre_log("TIREB01", 2, 0, "MINTED"),
        tyre_log("TIREB02", 3, 0, "MINTED"),
        tyre_log("TIREB01", 9, 0, "RETREAD"),
    ];
    let events = decode(&logs);
    let heights = HistoryReconciler::heights_for(&events, &AssetId::new("TIREB01"));
    assert_eq!(heights.into_iter().collect::<Vec<_>>(), vec![2, 9]);
}
