// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-process ledger.
//!
//! Deterministic stand-in for the passport program used by tests and
//! demos. It automines one block per accepted
//! submission and enforces the same coarse rules as the deployed program:
//! - only a `Manufacturer` may mint
//! - only the current owner may record events, transfer or change state
//! - state only moves forward
//! - only the regulator may register roles
//!
//! Faults can be injected to exercise retry and isolation paths.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;

use passport_kernel::{
    Address, AssetId, AssetSnapshot, BatchId, LedgerCommand, LifecycleState, OffchainHash, RawLog,
    TxRef, ASSET_EVENT,
};

use super::{LedgerClient, LedgerError, LedgerErrorKind, LedgerResult, LogQuery, Receipt, Submission};

pub const GENESIS_TIME: u64 = 1_762_300_800;
pub const BLOCK_INTERVAL_SECS: u64 = 12;
/// Smallest resource ceiling a write is accepted with.
pub const MIN_GAS_LIMIT: u64 = 100_000;

pub const ROLE_MANUFACTURER: &str = "Manufacturer";

#[derive(Clone, Debug)]
struct AssetRecord {
    batch: BatchId,
    owner: Address,
    state: LifecycleState,
    history_len: u64,
}

#[derive(Default)]
struct LedgerState {
    regulator: Address,
    unresolved: bool,
    assets: BTreeMap<AssetId, AssetRecord>,
    batches: BTreeMap<BatchId, Vec<AssetId>>,
    roles: BTreeMap<Address, String>,
    logs: Vec<RawLog>,
    /// Timestamp per block, index = height.
    blocks: Vec<u64>,
    sequences: BTreeMap<Address, u64>,
    receipts: BTreeMap<TxRef, Receipt>,
    injected_submit_faults: VecDeque<LedgerErrorKind>,
    failing_receipts: usize,
    failing_snapshots: BTreeMap<AssetId, LedgerErrorKind>,
    failing_log_queries: usize,
    reverse_logs: bool,
    submissions: Vec<Submission>,
    simulations: Vec<(Address, LedgerCommand)>,
}

pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Empty ledger whose role registry is administered by `regulator`.
    pub fn new(regulator: Address) -> Self {
        let state = LedgerState {
            regulator,
            blocks: vec![GENESIS_TIME],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // A panic while holding the lock only happens in a failing test.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registers a role without a submission, as a deployment script would.
    pub fn seed_role(&self, address: &Address, role: &str) {
        self.lock().roles.insert(address.clone(), role.to_string());
    }

    /// Applies a command directly, consuming `actor`'s next sequence number.
    pub fn seed(&self, actor: &Address, command: LedgerCommand) -> LedgerResult<TxRef> {
        let mut st = self.lock();
        let sequence = st.sequences.get(actor).copied().unwrap_or(0);
        let submission = Submission {
            actor: actor.clone(),
            sequence,
            gas_limit: MIN_GAS_LIMIT,
            command,
        };
        st.execute(&submission)
    }

    /// Makes `resolve_program` fail as if no program were deployed.
    pub fn set_unresolved(&self, unresolved: bool) {
        self.lock().unresolved = unresolved;
    }

    /// The next submissions fail with these kinds, in order, before any
    /// rule is checked. Nothing is consumed by an injected failure.
    pub fn inject_submit_faults(&self, kinds: impl IntoIterator<Item = LedgerErrorKind>) {
        self.lock().injected_submit_faults.extend(kinds);
    }

    /// The next `n` well-formed submissions are included but fail on
    /// execution: the sequence is consumed and the receipt says not accepted.
    pub fn inject_failed_receipts(&self, n: usize) {
        self.lock().failing_receipts = n;
    }

    pub fn fail_snapshot(&self, asset: &AssetId, kind: LedgerErrorKind) {
        self.lock().failing_snapshots.insert(asset.clone(), kind);
    }

    pub fn fail_next_log_queries(&self, n: usize) {
        self.lock().failing_log_queries = n;
    }

    /// Return logs newest-first, to prove consumers do not rely on order.
    pub fn set_reverse_logs(&self, reverse: bool) {
        self.lock().reverse_logs = reverse;
    }

    /// Appends an arbitrary log entry in a fresh block.
    pub fn push_raw_log(&self, event_name: &str, fields: serde_json::Value) {
        let mut st = self.lock();
        let height = st.mine_block();
        let tx_ref = TxRef(format!("0x{:064x}", height));
        st.logs.push(RawLog {
            block_height: height,
            log_index: 0,
            tx_ref,
            event_name: event_name.to_string(),
            fields,
        });
    }

    /// Every submission received, accepted or not.
    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    pub fn submissions_for(&self, asset: &AssetId) -> usize {
        self.lock()
            .submissions
            .iter()
            .filter(|s| s.command.asset_id() == Some(asset))
            .count()
    }

    pub fn simulations(&self) -> Vec<(Address, LedgerCommand)> {
        self.lock().simulations.clone()
    }

    pub fn sequence_of(&self, actor: &Address) -> u64 {
        self.lock().sequences.get(actor).copied().unwrap_or(0)
    }

    pub fn height(&self) -> u64 {
        (self.lock().blocks.len() - 1) as u64
    }
}

fn tx_ref_for(actor: &Address, sequence: u64, height: u64) -> TxRef {
    let digest = OffchainHash::of_document(format!("{}:{}:{}", actor, sequence, height).as_bytes());
    TxRef(format!("0x{}", hex::encode(digest.0)))
}

impl LedgerState {
    fn mine_block(&mut self) -> u64 {
        let height = self.blocks.len() as u64;
        self.blocks.push(GENESIS_TIME + height * BLOCK_INTERVAL_SECS);
        height
    }

    fn owned(&self, asset: &AssetId, actor: &Address) -> LedgerResult<&AssetRecord> {
        let record = self
            .assets
            .get(asset)
            .ok_or_else(|| LedgerError::reverted(format!("unknown tyre {}", asset)))?;
        if &record.owner != actor {
            return Err(LedgerError::reverted("caller is not the current owner"));
        }
        Ok(record)
    }

    fn check(&self, actor: &Address, command: &LedgerCommand) -> LedgerResult<()> {
        match command {
            LedgerCommand::MintAsset { asset_id, .. } => {
                self.require_manufacturer(actor)?;
                if self.assets.contains_key(asset_id) {
                    return Err(LedgerError::reverted(format!("tyre {} already minted", asset_id)));
                }
            }
            LedgerCommand::MintBatch { batch_id, asset_ids } => {
                self.require_manufacturer(actor)?;
                if self.batches.contains_key(batch_id) {
                    return Err(LedgerError::reverted(format!("batch {} already exists", batch_id)));
                }
                if asset_ids.is_empty() {
                    return Err(LedgerError::reverted("empty batch"));
                }
                for (i, id) in asset_ids.iter().enumerate() {
                    if self.assets.contains_key(id) || asset_ids[..i].contains(id) {
                        return Err(LedgerError::reverted(format!("tyre {} already minted", id)));
                    }
                }
            }
            LedgerCommand::RecordEvent { asset_id, event_type, .. } => {
                self.owned(asset_id, actor)?;
                if event_type.is_empty() {
                    return Err(LedgerError::reverted("empty event type"));
                }
            }
            LedgerCommand::TransferOwnership { asset_id, new_owner } => {
                let record = self.owned(asset_id, actor)?;
                if &record.owner == new_owner {
                    return Err(LedgerError::reverted("already owned by recipient"));
                }
            }
            LedgerCommand::UpdateState { asset_id, new_state } => {
                let record = self.owned(asset_id, actor)?;
                if *new_state <= record.state {
                    return Err(LedgerError::reverted(format!(
                        "illegal transition {} -> {}",
                        record.state, new_state
                    )));
                }
            }
            LedgerCommand::RegisterRole { .. } => {
                if actor != &self.regulator {
                    return Err(LedgerError::reverted("only the regulator registers roles"));
                }
            }
        }
        Ok(())
    }

    fn require_manufacturer(&self, actor: &Address) -> LedgerResult<()> {
        match self.roles.get(actor) {
            Some(role) if role == ROLE_MANUFACTURER => Ok(()),
            _ => Err(LedgerError::reverted("caller is not a manufacturer")),
        }
    }

    fn execute(&mut self, submission: &Submission) -> LedgerResult<TxRef> {
        let actor = &submission.actor;
        let expected = self.sequences.get(actor).copied().unwrap_or(0);
        if submission.sequence < expected {
            return Err(LedgerError::new(
                LedgerErrorKind::SequenceConflict,
                format!("sequence {} has already been used", submission.sequence),
            ));
        }
        if submission.sequence > expected {
            return Err(LedgerError::new(
                LedgerErrorKind::Rejected,
                format!("sequence gap: expected {}, got {}", expected, submission.sequence),
            ));
        }
        if submission.gas_limit < MIN_GAS_LIMIT {
            return Err(LedgerError::new(LedgerErrorKind::Rejected, "intrinsic gas too low"));
        }

        if self.failing_receipts > 0 {
            // Included, sequence consumed, execution failed: no state change.
            self.failing_receipts -= 1;
            let height = self.mine_block();
            let tx_ref = tx_ref_for(actor, submission.sequence, height);
            self.sequences.insert(actor.clone(), expected + 1);
            self.receipts.insert(
                tx_ref.clone(),
                Receipt {
                    tx_ref: tx_ref.clone(),
                    block_height: height,
                    accepted: false,
                },
            );
            return Ok(tx_ref);
        }
        self.check(actor, &submission.command)?;

        let height = self.mine_block();
        let tx_ref = tx_ref_for(actor, submission.sequence, height);
        let timestamp = self.blocks[height as usize];
        let mut log_index = 0u32;

        match &submission.command {
            LedgerCommand::MintAsset { asset_id, batch_id } => {
                self.mint(asset_id, batch_id, actor);
                self.emit(asset_id, "MINTED", OffchainHash::ZERO, "", actor, height, &mut log_index, &tx_ref, timestamp);
            }
            LedgerCommand::MintBatch { batch_id, asset_ids } => {
                for asset_id in asset_ids {
                    self.mint(asset_id, batch_id, actor);
                    self.emit(asset_id, "MINTED", OffchainHash::ZERO, "", actor, height, &mut log_index, &tx_ref, timestamp);
                }
            }
            LedgerCommand::RecordEvent { asset_id, event_type, offchain_hash, offchain_uri } => {
                self.emit(asset_id, event_type, *offchain_hash, offchain_uri, actor, height, &mut log_index, &tx_ref, timestamp);
            }
            LedgerCommand::TransferOwnership { asset_id, new_owner } => {
                if let Some(record) = self.assets.get_mut(asset_id) {
                    record.owner = new_owner.clone();
                }
                self.emit(asset_id, "OWNERSHIP_TRANSFERRED", OffchainHash::ZERO, "", actor, height, &mut log_index, &tx_ref, timestamp);
            }
            LedgerCommand::UpdateState { asset_id, new_state } => {
                if let Some(record) = self.assets.get_mut(asset_id) {
                    record.state = *new_state;
                }
                let label = format!("STATE_{}", new_state.label());
                self.emit(asset_id, &label, OffchainHash::ZERO, "", actor, height, &mut log_index, &tx_ref, timestamp);
            }
            LedgerCommand::RegisterRole { address, role } => {
                self.roles.insert(address.clone(), role.clone());
                self.logs.push(RawLog {
                    block_height: height,
                    log_index,
                    tx_ref: tx_ref.clone(),
                    event_name: "RoleRegistered".to_string(),
                    fields: json!({ "account": address, "role": role }),
                });
            }
        }

        self.sequences.insert(actor.clone(), expected + 1);
        self.receipts.insert(
            tx_ref.clone(),
            Receipt {
                tx_ref: tx_ref.clone(),
                block_height: height,
                accepted: true,
            },
        );
        Ok(tx_ref)
    }

    fn mint(&mut self, asset_id: &AssetId, batch_id: &BatchId, actor: &Address) {
        self.assets.insert(
            asset_id.clone(),
            AssetRecord {
                batch: batch_id.clone(),
                owner: actor.clone(),
                state: LifecycleState::Manufactured,
                history_len: 0,
            },
        );
        self.batches.entry(batch_id.clone()).or_default().push(asset_id.clone());
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &mut self,
        asset_id: &AssetId,
        event_type: &str,
        offchain_hash: OffchainHash,
        offchain_uri: &str,
        actor: &Address,
        height: u64,
        log_index: &mut u32,
        tx_ref: &TxRef,
        timestamp: u64,
    ) {
        let Some(record) = self.assets.get_mut(asset_id) else {
            return;
        };
        record.history_len += 1;
        let fields = json!({
            "tireId": asset_id,
            "batchId": record.batch,
            "eventType": event_type,
            "offchainHash": offchain_hash,
            "offchainURI": offchain_uri,
            "actor": actor,
            "currentOwner": record.owner,
            "state": record.state,
            "timestamp": timestamp,
        });
        self.logs.push(RawLog {
            block_height: height,
            log_index: *log_index,
            tx_ref: tx_ref.clone(),
            event_name: ASSET_EVENT.to_string(),
            fields,
        });
        *log_index += 1;
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn resolve_program(&self) -> LedgerResult<()> {
        if self.lock().unresolved {
            return Err(LedgerError::new(LedgerErrorKind::Unresolved, "no program at configured address"));
        }
        Ok(())
    }

    async fn snapshot(&self, asset: &AssetId) -> LedgerResult<AssetSnapshot> {
        let st = self.lock();
        if let Some(kind) = st.failing_snapshots.get(asset) {
            return Err(LedgerError::new(*kind, format!("injected snapshot failure for {}", asset)));
        }
        let record = st
            .assets
            .get(asset)
            .ok_or_else(|| LedgerError::new(LedgerErrorKind::NotFound, format!("tyre {} not found", asset)))?;
        Ok(AssetSnapshot {
            asset_id: asset.clone(),
            batch_id: record.batch.clone(),
            owner: record.owner.clone(),
            state: record.state,
            history_length: record.history_len,
        })
    }

    async fn batch_members(&self, batch: &BatchId) -> LedgerResult<Vec<AssetId>> {
        Ok(self.lock().batches.get(batch).cloned().unwrap_or_default())
    }

    async fn role(&self, address: &Address) -> LedgerResult<String> {
        Ok(self.lock().roles.get(address).cloned().unwrap_or_default())
    }

    async fn logs(&self, query: &LogQuery) -> LedgerResult<Vec<RawLog>> {
        let mut st = self.lock();
        if st.failing_log_queries > 0 {
            st.failing_log_queries -= 1;
            return Err(LedgerError::transport("injected log query failure"));
        }
        let mut out: Vec<RawLog> = st
            .logs
            .iter()
            .filter(|l| l.event_name == query.discriminator)
            .filter(|l| l.block_height >= query.from_height)
            .filter(|l| query.to_height.map_or(true, |to| l.block_height < to))
            .cloned()
            .collect();
        if st.reverse_logs {
            out.reverse();
        }
        Ok(out)
    }

    async fn block_time(&self, height: u64) -> LedgerResult<Option<u64>> {
        Ok(self.lock().blocks.get(height as usize).copied())
    }

    async fn latest_height(&self) -> LedgerResult<u64> {
        Ok(self.height())
    }

    async fn next_sequence(&self, actor: &Address) -> LedgerResult<u64> {
        Ok(self.sequence_of(actor))
    }

    async fn simulate(&self, actor: &Address, command: &LedgerCommand) -> LedgerResult<()> {
        let mut st = self.lock();
        st.simulations.push((actor.clone(), command.clone()));
        st.check(actor, command)
    }

    async fn submit(&self, submission: &Submission) -> LedgerResult<TxRef> {
        let mut st = self.lock();
        st.submissions.push(submission.clone());
        if let Some(kind) = st.injected_submit_faults.pop_front() {
            return Err(LedgerError::new(kind, "injected submission failure"));
        }
        st.execute(submission)
    }

    async fn await_receipt(&self, tx: &TxRef) -> LedgerResult<Receipt> {
        self.lock()
            .receipts
            .get(tx)
            .cloned()
            .ok_or_else(|| LedgerError::new(LedgerErrorKind::NotFound, format!("unknown transaction {}", tx)))
    }
}
