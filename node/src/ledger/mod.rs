// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger client abstraction.
//!
//! Every ledger interaction the engine performs goes through [`LedgerClient`].
//! Failures come back as a [`LedgerError`] whose [`LedgerErrorKind`] is set
//! once, by the client, from structured error codes. Retry and skip
//! decisions downstream look only at the kind.

pub mod memory;
pub mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use passport_kernel::{Address, AssetId, AssetSnapshot, BatchId, LedgerCommand, RawLog, TxRef};

pub use memory::MemoryLedger;
pub use rpc::RpcLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerErrorKind {
    /// Connection, timeout or non-success HTTP status.
    Transport,
    /// The asset, batch or transaction does not exist.
    NotFound,
    /// Execution reverted: ownership, role or state precondition failed.
    Reverted,
    /// The actor's sequence number was already used.
    SequenceConflict,
    /// Refused for any other reason (gas ceiling, sequence gap, bad params).
    Rejected,
    /// The program address does not resolve to a deployed program.
    Unresolved,
    /// The response could not be understood.
    Malformed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Transport, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Malformed, message)
    }

    pub fn reverted(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Reverted, message)
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Half-open log query `[from_height, to_height)`; `None` means up to the tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub discriminator: String,
    pub from_height: u64,
    pub to_height: Option<u64>,
}

/// A mutating call ready for the ledger: who sends it, at which sequence
/// number, with which resource ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub actor: Address,
    pub sequence: u64,
    pub gas_limit: u64,
    pub command: LedgerCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_ref: TxRef,
    pub block_height: u64,
    /// False when the call was included but its execution failed.
    pub accepted: bool,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fails with `Unresolved` when the configured program address has no
    /// deployed program behind it.
    async fn resolve_program(&self) -> LedgerResult<()>;

    async fn snapshot(&self, asset: &AssetId) -> LedgerResult<AssetSnapshot>;

    async fn batch_members(&self, batch: &BatchId) -> LedgerResult<Vec<AssetId>>;

    /// Role label bound to `address`; empty when none is registered.
    async fn role(&self, address: &Address) -> LedgerResult<String>;

    /// All logs matching the discriminator in the range. The asset id is not
    /// an indexed field, so there is no way to narrow this further here.
    async fn logs(&self, query: &LogQuery) -> LedgerResult<Vec<RawLog>>;

    async fn block_time(&self, height: u64) -> LedgerResult<Option<u64>>;

    async fn latest_height(&self) -> LedgerResult<u64>;

    /// Next sequence number the ledger expects from `actor`.
    async fn next_sequence(&self, actor: &Address) -> LedgerResult<u64>;

    /// Executes `command` as `actor` against current state without
    /// persisting anything.
    async fn simulate(&self, actor: &Address, command: &LedgerCommand) -> LedgerResult<()>;

    async fn submit(&self, submission: &Submission) -> LedgerResult<TxRef>;

    /// Blocks until the transaction is durably included.
    async fn await_receipt(&self, tx: &TxRef) -> LedgerResult<Receipt>;
}
