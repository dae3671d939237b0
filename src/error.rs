//! Error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid offchain hash: {0}")]
    InvalidHash(String),
    #[error("unknown lifecycle state: {0}")]
    UnknownState(String),
}

/// A raw log entry that could not be turned into an `AssetEvent`.
///
/// Never fatal: the scan that produced the entry records the error and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("event name mismatch: expected {expected}, found {found}")]
    NameMismatch { expected: String, found: String },
    #[error("malformed event payload: {0}")]
    Shape(String),
    #[error("invalid field in event payload: {0}")]
    Field(#[from] KernelError),
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
