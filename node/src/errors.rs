// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use passport_kernel::AssetId;
use thiserror::Error;

use crate::ledger::{LedgerError, LedgerErrorKind};

#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing endpoint, address or secret. Aborts the whole run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport failure while reading logs or snapshots. Not retried here.
    #[error("Fetch error: {0}")]
    Fetch(LedgerError),

    /// The dry run says the ledger would reject this call.
    #[error("Precondition violation on {asset}: {reason}")]
    PreconditionViolation { asset: String, reason: String },

    /// The actor's sequence number was already consumed. Transient: the
    /// submitter retries it once, and reports an exhausted retry as
    /// `Submission`.
    #[error("Sequence conflict: {0}")]
    SequenceConflict(LedgerError),

    #[error("Submission failure: {0}")]
    Submission(LedgerError),

    #[error("Persistence error for {asset}: {message}")]
    Persistence { asset: AssetId, message: String },

    #[error("Export error: {0}")]
    Export(#[from] std::io::Error),

    #[error("Webhook rejected upload (status {status}): {body}")]
    Webhook { status: u16, body: String },
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }

    pub fn persistence(asset: &AssetId, msg: impl ToString) -> Self {
        EngineError::Persistence {
            asset: asset.clone(),
            message: msg.to_string(),
        }
    }

    /// Classifies a failed read call.
    pub fn from_read(err: LedgerError) -> Self {
        match err.kind {
            LedgerErrorKind::Unresolved => EngineError::Configuration(err.to_string()),
            _ => EngineError::Fetch(err),
        }
    }

    /// Classifies a failed write call.
    pub fn from_submit(err: LedgerError) -> Self {
        match err.kind {
            LedgerErrorKind::SequenceConflict => EngineError::SequenceConflict(err),
            LedgerErrorKind::Unresolved => EngineError::Configuration(err.to_string()),
            _ => EngineError::Submission(err),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }

    /// Short label used in outcome tables and metrics.
    pub fn class(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "ConfigurationError",
            EngineError::Fetch(_) => "FetchError",
            EngineError::PreconditionViolation { .. } => "PreconditionViolation",
            EngineError::SequenceConflict(_) => "SequenceConflict",
            EngineError::Submission(_) => "SubmissionFailure",
            EngineError::Persistence { .. } => "PersistenceError",
            EngineError::Export(_) => "ExportError",
            EngineError::Webhook { .. } => "WebhookError",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
