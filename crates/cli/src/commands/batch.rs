use passport_kernel::{Address, BatchId, LifecycleState, OffchainHash};
use passport_node::orchestrator::{BatchPlan, BatchReport, BatchTarget, Eligibility, FollowUp, OperationTemplate};

use super::print_report;
use crate::engine::PassportEngine;

async fn run_plan(engine: &PassportEngine, actor: Address, plan: BatchPlan) -> anyhow::Result<BatchReport> {
    let mut submitter = engine.submitter(actor);
    let report = engine.orchestrator().run(&plan, &mut submitter).await?;
    print_report(&report);
    Ok(report)
}

/// Transfers every tyre of `batch` that `from` currently owns.
pub async fn transfer(engine: &PassportEngine, from: Address, batch: BatchId, to: Address) -> anyhow::Result<BatchReport> {
    println!("\nTransferring {} from {} to {}\n", batch, from, to);
    let plan = BatchPlan {
        target: BatchTarget::Batch(batch),
        eligibility: Eligibility::OwnedBy(from.clone()),
        operation: OperationTemplate::Transfer { new_owner: to },
        follow_up: None,
    };
    run_plan(engine, from, plan).await
}

/// Records the same document (e.g. a goods-received note) on every tyre of
/// `batch` that `from` owns.
pub async fn record(
    engine: &PassportEngine,
    from: Address,
    batch: BatchId,
    event_type: String,
    offchain_hash: OffchainHash,
    offchain_uri: String,
) -> anyhow::Result<BatchReport> {
    println!("\nRecording {} on {}\n", event_type, batch);
    let plan = BatchPlan {
        target: BatchTarget::Batch(batch),
        eligibility: Eligibility::OwnedBy(from.clone()),
        operation: OperationTemplate::RecordEvent {
            event_type,
            offchain_hash,
            offchain_uri,
        },
        follow_up: None,
    };
    run_plan(engine, from, plan).await
}

/// Advances every tyre of `batch` owned by `from` to `state`, optionally
/// documenting each change with a follow-up event.
pub async fn set_state(
    engine: &PassportEngine,
    from: Address,
    batch: BatchId,
    state: LifecycleState,
    follow_up: Option<FollowUp>,
) -> anyhow::Result<BatchReport> {
    println!("\nMoving {} to {}\n", batch, state);
    let plan = BatchPlan {
        target: BatchTarget::Batch(batch),
        eligibility: Eligibility::OwnedBy(from.clone()),
        operation: OperationTemplate::UpdateState { new_state: state },
        follow_up,
    };
    run_plan(engine, from, plan).await
}
