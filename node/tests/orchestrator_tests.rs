mod support;

use std::sync::Arc;

use passport_kernel::{LedgerCommand, LifecycleState, OffchainHash};
use passport_node::errors::EngineError;
use passport_node::gate::PreconditionGate;
use passport_node::ledger::{LedgerClient, LedgerErrorKind};
use passport_node::mirror::{MemoryMirrorStore, MirrorStore};
use passport_node::orchestrator::{
    BatchOrchestrator, BatchPlan, BatchTarget, Eligibility, FollowUp, OperationTemplate, OutcomeStatus, SkipReason,
};
use passport_node::throttle::Unthrottled;

use support::*;

fn orchestrator(ledger: &Arc<passport_node::ledger::MemoryLedger>) -> (BatchOrchestrator, Arc<Unthrottled>) {
    let throttle = Arc::new(Unthrottled::new());
    let client: Arc<dyn LedgerClient> = ledger.clone();
    (BatchOrchestrator::new(client, throttle.clone()), throttle)
}

fn transfer_plan(target: BatchTarget, eligibility: Eligibility) -> BatchPlan {
    BatchPlan {
        target,
        eligibility,
        operation: OperationTemplate::Transfer {
            new_owner: distributor(),
        },
        follow_up: None,
    }
}

#[tokio::test]
async fn batch_transfer_skips_the_asset_owned_elsewhere() {
    let ledger = minted(4);
    transfer(&ledger, &manufacturer(), &tyre(4), &retailer());

    let store = Arc::new(MemoryMirrorStore::new());
    let mirror: Arc<dyn MirrorStore> = store.clone();
    let (orch, throttle) = orchestrator(&ledger);
    let orch = orch.with_mirror(mirror);

    let mut sub = submitter(&ledger, manufacturer());
    let report = orch
        .run(&transfer_plan(BatchTarget::Batch(batch()), Eligibility::Any), &mut sub)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 0);
    assert!(matches!(
        report.outcome(&tyre(4)).unwrap().status,
        OutcomeStatus::Skipped(SkipReason::PreconditionViolation(_))
    ));
    assert_eq!(throttle.pauses(), 3);

    for n in 1..=3 {
        assert_eq!(store.snapshot(&tyre(n)).unwrap().owner, distributor().to_string());
        assert_eq!(report.outcome(&tyre(n)).unwrap().mirror, Some(Ok(())));
    }
    assert_eq!(store.snapshot(&tyre(4)).unwrap().owner, retailer().to_string());
    assert_eq!(sub.context().accepted(), 3);
}

#[tokio::test]
async fn rejected_dry_run_never_reaches_submission() {
    let ledger = minted(2);
    let (orch, _) = orchestrator(&ledger);
    let mut sub = submitter(&ledger, distributor());

    let report = orch
        .run(&transfer_plan(BatchTarget::Batch(batch()), Eligibility::Any), &mut sub)
        .await
        .unwrap();

    assert_eq!(report.skipped(), 2);
    assert_eq!(ledger.simulations().len(), 2);
    assert!(ledger.submissions().is_empty());
}

#[tokio::test]
async fn ineligible_assets_are_skipped_without_a_dry_run() {
    let ledger = minted(3);
    transfer(&ledger, &manufacturer(), &tyre(2), &retailer());
    let (orch, _) = orchestrator(&ledger);
    let mut sub = submitter(&ledger, manufacturer());

    let plan = transfer_plan(
        BatchTarget::Batch(batch()),
        Eligibility::OwnedBy(manufacturer()),
    );
    let report = orch.run(&plan, &mut sub).await.unwrap();

    assert_eq!(report.succeeded(), 2);
    assert!(matches!(
        report.outcome(&tyre(2)).unwrap().status,
        OutcomeStatus::Skipped(SkipReason::Ineligible(_))
    ));
    assert!(ledger
        .simulations()
        .iter()
        .all(|(_, cmd)| cmd.asset_id() != Some(&tyre(2))));
}

#[tokio::test]
async fn repeated_non_conflict_failure_is_reported_once() {
    let ledger = minted(2);
    ledger.inject_submit_faults([LedgerErrorKind::SequenceConflict, LedgerErrorKind::Rejected]);
    let (orch, _) = orchestrator(&ledger);
    let mut sub = submitter(&ledger, manufacturer());

    let report = orch
        .run(&transfer_plan(BatchTarget::Batch(batch()), Eligibility::Any), &mut sub)
        .await
        .unwrap();

    let first = report.outcome(&tyre(1)).unwrap();
    assert!(matches!(first.status, OutcomeStatus::Failed(EngineError::Submission(_))));
    assert_eq!(ledger.submissions_for(&tyre(1)), 2);
    assert_eq!(report.failed(), 1);

    // The failure stays on its own asset.
    assert!(report.outcome(&tyre(2)).unwrap().is_success());
    assert_eq!(ledger.submissions_for(&tyre(2)), 1);
}

#[tokio::test]
async fn non_conflict_failure_is_not_retried() {
    let ledger = minted(1);
    ledger.inject_submit_faults([LedgerErrorKind::Rejected, LedgerErrorKind::Rejected]);
    let (orch, _) = orchestrator(&ledger);
    let mut sub = submitter(&ledger, manufacturer());

    let report = orch
        .run(&transfer_plan(BatchTarget::Assets(vec![tyre(1)]), Eligibility::Any), &mut sub)
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(ledger.submissions_for(&tyre(1)), 1);
    assert_eq!(ledger.sequence_of(&manufacturer()), 1);
}

#[tokio::test]
async fn snapshot_failure_fails_only_that_asset() {
    let ledger = minted(3);
    ledger.fail_snapshot(&tyre(2), LedgerErrorKind::Transport);
    let (orch, _) = orchestrator(&ledger);
    let mut sub = submitter(&ledger, manufacturer());

    let report = orch
        .run(&transfer_plan(BatchTarget::Batch(batch()), Eligibility::Any), &mut sub)
        .await
        .unwrap();

    assert!(matches!(
        report.outcome(&tyre(2)).unwrap().status,
        OutcomeStatus::Failed(EngineError::Fetch(_))
    ));
    assert_eq!(report.succeeded(), 2);
}

#[tokio::test]
async fn unresolved_program_aborts_the_run() {
    let ledger = minted(2);
    ledger.set_unresolved(true);
    let (orch, _) = orchestrator(&ledger);
    let mut sub = submitter(&ledger, manufacturer());

    let err = orch
        .run(&transfer_plan(BatchTarget::Batch(batch()), Eligibility::Any), &mut sub)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Configuration(_)));
    assert!(ledger.simulations().is_empty());
}

#[tokio::test]
async fn state_change_with_follow_up_document() {
    let ledger = minted(2);
    let (orch, _) = orchestrator(&ledger);
    let mut sub = submitter(&ledger, manufacturer());

    let plan = BatchPlan {
        target: BatchTarget::Batch(batch()),
        eligibility: Eligibility::InState(LifecycleState::Manufactured),
        operation: OperationTemplate::UpdateState {
            new_state: LifecycleState::InMarket,
        },
        follow_up: Some(FollowUp {
            event_type: "QC_PASSED".into(),
            offchain_hash: OffchainHash::of_document(b"qc report"),
            offchain_uri: "ipfs://qc".into(),
        }),
    };
    let report = orch.run(&plan, &mut sub).await.unwrap();

    assert_eq!(report.succeeded(), 2);
    for n in 1..=2 {
        assert!(matches!(report.outcome(&tyre(n)).unwrap().follow_up, Some(Ok(_))));
        let snap = ledger.snapshot(&tyre(n)).await.unwrap();
        assert_eq!(snap.state, LifecycleState::InMarket);
        // mint + state change + follow-up
        assert_eq!(snap.history_length, 3);
    }
    assert_eq!(sub.context().accepted(), 4);
}

#[tokio::test]
async fn gate_classifies_rejections_as_precondition_violations() {
    let ledger = minted(1);
    let client: Arc<dyn LedgerClient> = ledger.clone();
    let gate = PreconditionGate::new(client);

    let backwards = LedgerCommand::UpdateState {
        asset_id: tyre(1),
        new_state: LifecycleState::Manufactured,
    };
    let err = gate.check(&manufacturer(), backwards).await.unwrap_err();
    assert!(matches!(err, EngineError::PreconditionViolation { .. }));

    let unknown = LedgerCommand::TransferOwnership {
        asset_id: tyre(9),
        new_owner: retailer(),
    };
    let err = gate.check(&manufacturer(), unknown).await.unwrap_err();
    assert_eq!(err.class(), "PreconditionViolation");
}
