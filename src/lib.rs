// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! passport-kernel: deterministic reconstruction of per-asset ledger history.
//!
//! Everything in this crate is pure. Ledger access, persistence and
//! submission live in `passport-node`; this crate only describes the data
//! and turns unordered raw logs into a canonical, sequenced history.

pub mod error;
pub mod types;
pub mod snapshot;
pub mod event;
pub mod command;
pub mod decode;
pub mod reconcile;
pub mod verify;

pub use command::{CommandKind, LedgerCommand};
pub use decode::{DecodedLogs, EventDecoder};
pub use error::{DecodeError, KernelError};
pub use event::{AssetEvent, RawLog, ASSET_EVENT};
pub use reconcile::{BlockTimes, HistoryReconciler};
pub use snapshot::AssetSnapshot;
pub use types::enums::LifecycleState;
pub use types::id::{Address, AssetId, BatchId, OffchainHash, TxRef};

#[cfg(test)]
pub mod tests;
