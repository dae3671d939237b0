// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Batch transitions with per-asset failure isolation.
//!
//! For every target asset, in order:
//! 1. read the snapshot
//! 2. apply the eligibility filter
//! 3. dry-run the operation through the precondition gate
//! 4. submit it through the actor's sequenced submitter
//! 5. optionally submit a follow-up event documenting the action
//! 6. pause on the throttle before the next asset
//!
//! Then all processed assets are reconciled and mirrored in one scan.
//! Only a configuration error stops the run; everything else is recorded on
//! the asset it happened to.

use std::fmt;
use std::sync::Arc;

use passport_kernel::{Address, AssetId, AssetSnapshot, BatchId, LedgerCommand, LifecycleState, OffchainHash, TxRef};

use crate::errors::{EngineError, Result};
use crate::gate::PreconditionGate;
use crate::ledger::LedgerClient;
use crate::mirror::{MirrorStore, MirrorWriter};
use crate::snapshot::SnapshotReader;
use crate::submitter::SequencedSubmitter;
use crate::sync::{Checkpoint, HistorySync};
use crate::throttle::Throttle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchTarget {
    Batch(BatchId),
    Assets(Vec<AssetId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Eligibility {
    #[default]
    Any,
    OwnedBy(Address),
    InState(LifecycleState),
}

impl Eligibility {
    /// `None` when eligible, otherwise why not.
    pub fn reject_reason(&self, snapshot: &AssetSnapshot) -> Option<String> {
        match self {
            Eligibility::Any => None,
            Eligibility::OwnedBy(owner) if snapshot.is_owned_by(owner) => None,
            Eligibility::OwnedBy(owner) => Some(format!("owned by {}, not {}", snapshot.owner, owner)),
            Eligibility::InState(state) if snapshot.state == *state => None,
            Eligibility::InState(state) => Some(format!("in state {}, not {}", snapshot.state, state)),
        }
    }
}

/// The per-asset mutation a batch applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTemplate {
    Transfer {
        new_owner: Address,
    },
    RecordEvent {
        event_type: String,
        offchain_hash: OffchainHash,
        offchain_uri: String,
    },
    UpdateState {
        new_state: LifecycleState,
    },
}

impl OperationTemplate {
    pub fn command_for(&self, asset: &AssetId) -> LedgerCommand {
        match self {
            OperationTemplate::Transfer { new_owner } => LedgerCommand::TransferOwnership {
                asset_id: asset.clone(),
                new_owner: new_owner.clone(),
            },
            OperationTemplate::RecordEvent {
                event_type,
                offchain_hash,
                offchain_uri,
            } => LedgerCommand::RecordEvent {
                asset_id: asset.clone(),
                event_type: event_type.clone(),
                offchain_hash: *offchain_hash,
                offchain_uri: offchain_uri.clone(),
            },
            OperationTemplate::UpdateState { new_state } => LedgerCommand::UpdateState {
                asset_id: asset.clone(),
                new_state: *new_state,
            },
        }
    }
}

/// Event recorded after a successful operation, documenting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub event_type: String,
    pub offchain_hash: OffchainHash,
    pub offchain_uri: String,
}

impl FollowUp {
    fn command_for(&self, asset: &AssetId) -> LedgerCommand {
        LedgerCommand::RecordEvent {
            asset_id: asset.clone(),
            event_type: self.event_type.clone(),
            offchain_hash: self.offchain_hash,
            offchain_uri: self.offchain_uri.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub target: BatchTarget,
    pub eligibility: Eligibility,
    pub operation: OperationTemplate,
    pub follow_up: Option<FollowUp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Ineligible(String),
    PreconditionViolation(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Ineligible(r) => write!(f, "Ineligible: {}", r),
            SkipReason::PreconditionViolation(r) => write!(f, "PreconditionViolation: {}", r),
        }
    }
}

#[derive(Debug)]
pub enum OutcomeStatus {
    Success { tx_ref: TxRef },
    Skipped(SkipReason),
    Failed(EngineError),
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Success { .. } => "SUCCESS",
            OutcomeStatus::Skipped(_) => "SKIPPED",
            OutcomeStatus::Failed(_) => "FAILED",
        }
    }
}

/// Result of a secondary step that does not change the asset's status.
pub type StepResult<T> = std::result::Result<T, String>;

#[derive(Debug)]
pub struct AssetOutcome {
    pub asset_id: AssetId,
    pub status: OutcomeStatus,
    pub follow_up: Option<StepResult<TxRef>>,
    pub mirror: Option<StepResult<()>>,
}

impl AssetOutcome {
    fn new(asset_id: AssetId, status: OutcomeStatus) -> Self {
        Self {
            asset_id,
            status,
            follow_up: None,
            mirror: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }

    /// Human-readable detail for outcome tables.
    pub fn detail(&self) -> String {
        match &self.status {
            OutcomeStatus::Success { tx_ref } => tx_ref.to_string(),
            OutcomeStatus::Skipped(reason) => reason.to_string(),
            OutcomeStatus::Failed(err) => format!("{}: {}", err.class(), err),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<AssetOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn outcome(&self, asset: &AssetId) -> Option<&AssetOutcome> {
        self.outcomes.iter().find(|o| &o.asset_id == asset)
    }
}

pub struct BatchOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    snapshots: SnapshotReader,
    gate: PreconditionGate,
    throttle: Arc<dyn Throttle>,
    mirror: Option<MirrorWriter<Arc<dyn MirrorStore>>>,
}

impl BatchOrchestrator {
    pub fn new(ledger: Arc<dyn LedgerClient>, throttle: Arc<dyn Throttle>) -> Self {
        Self {
            snapshots: SnapshotReader::new(ledger.clone()),
            gate: PreconditionGate::new(ledger.clone()),
            ledger,
            throttle,
            mirror: None,
        }
    }

    /// Mirror every processed asset at the end of a run.
    pub fn with_mirror(mut self, store: Arc<dyn MirrorStore>) -> Self {
        self.mirror = Some(MirrorWriter::new(store));
        self
    }

    /// Runs `plan` with `submitter` as the acting identity.
    ///
    /// `Err` only for setup failures: the program does not resolve, the
    /// batch membership cannot be read, or a configuration error surfaces
    /// mid-run. Per-asset failures land in the report.
    pub async fn run(&self, plan: &BatchPlan, submitter: &mut SequencedSubmitter) -> Result<BatchReport> {
        self.ledger
            .resolve_program()
            .await
            .map_err(EngineError::from_read)?;

        let assets = match &plan.target {
            BatchTarget::Batch(batch) => self.snapshots.batch_members(batch).await?,
            BatchTarget::Assets(list) => list.clone(),
        };
        tracing::info!(
            actor = %submitter.actor(),
            assets = assets.len(),
            "Starting batch {:?}",
            plan.operation
        );

        let mut report = BatchReport::default();
        for (i, asset) in assets.iter().enumerate() {
            if i > 0 {
                self.throttle.pause().await;
            }
            let outcome = self.process(plan, asset, submitter).await?;
            match &outcome.status {
                OutcomeStatus::Success { .. } => {
                    tracing::info!(asset = %asset, "SUCCESS");
                }
                OutcomeStatus::Skipped(reason) => {
                    metrics::counter!("passport_batch_skipped_total", 1);
                    tracing::warn!(asset = %asset, "SKIPPED: {}", reason);
                }
                OutcomeStatus::Failed(err) => {
                    metrics::counter!("passport_batch_failed_total", 1, "class" => err.class());
                    tracing::error!(asset = %asset, "FAILED: {}", err);
                }
            }
            report.outcomes.push(outcome);
        }

        if let Some(writer) = &self.mirror {
            self.mirror_outcomes(writer, &assets, &mut report).await;
        }

        tracing::info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Batch finished"
        );
        Ok(report)
    }

    async fn process(
        &self,
        plan: &BatchPlan,
        asset: &AssetId,
        submitter: &mut SequencedSubmitter,
    ) -> Result<AssetOutcome> {
        let snapshot = match self.snapshots.snapshot(asset).await {
            Ok(s) => s,
            Err(e) => return Self::isolate(asset, e),
        };

        if let Some(reason) = plan.eligibility.reject_reason(&snapshot) {
            return Ok(AssetOutcome::new(
                asset.clone(),
                OutcomeStatus::Skipped(SkipReason::Ineligible(reason)),
            ));
        }

        let admitted = match self.gate.check(submitter.actor(), plan.operation.command_for(asset)).await {
            Ok(a) => a,
            Err(EngineError::PreconditionViolation { reason, .. }) => {
                return Ok(AssetOutcome::new(
                    asset.clone(),
                    OutcomeStatus::Skipped(SkipReason::PreconditionViolation(reason)),
                ));
            }
            Err(e) => return Self::isolate(asset, e),
        };

        let receipt = match submitter.submit(admitted).await {
            Ok(r) => r,
            Err(e) => return Self::isolate(asset, e),
        };

        let mut outcome = AssetOutcome::new(
            asset.clone(),
            OutcomeStatus::Success {
                tx_ref: receipt.tx_ref,
            },
        );

        if let Some(follow_up) = &plan.follow_up {
            let result = match self.gate.check(submitter.actor(), follow_up.command_for(asset)).await {
                Ok(admitted) => submitter.submit(admitted).await.map(|r| r.tx_ref),
                Err(e) => Err(e),
            };
            outcome.follow_up = Some(match result {
                Ok(tx) => Ok(tx),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(asset = %asset, "Follow-up event failed: {}", e);
                    Err(e.to_string())
                }
            });
        }

        Ok(outcome)
    }

    fn isolate(asset: &AssetId, err: EngineError) -> Result<AssetOutcome> {
        if err.is_fatal() {
            return Err(err);
        }
        Ok(AssetOutcome::new(asset.clone(), OutcomeStatus::Failed(err)))
    }

    async fn mirror_outcomes(
        &self,
        writer: &MirrorWriter<Arc<dyn MirrorStore>>,
        assets: &[AssetId],
        report: &mut BatchReport,
    ) {
        let sync = HistorySync::new(self.ledger.clone());
        match sync.mirror(writer, assets, &mut Checkpoint::default()).await {
            Ok(synced) => {
                for s in synced {
                    if let Some(outcome) = report.outcomes.iter_mut().find(|o| o.asset_id == s.asset_id) {
                        outcome.mirror = Some(s.result.map(|_| ()).map_err(|e| e.to_string()));
                    }
                }
            }
            Err(e) => {
                tracing::error!("Mirror scan failed: {}", e);
                for outcome in &mut report.outcomes {
                    outcome.mirror = Some(Err(e.to_string()));
                }
            }
        }
    }
}
