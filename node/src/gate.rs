// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Precondition dry-run.
//!
//! A mutating command is executed in simulation before a sequence number is
//! spent on it. The ledger gives no structured reason for a rejection, so
//! ownership, role and state failures all come back as the same
//! `PreconditionViolation`.

use std::sync::Arc;

use passport_kernel::{Address, LedgerCommand};

use crate::errors::{EngineError, Result};
use crate::ledger::{LedgerClient, LedgerErrorKind};

/// A command that passed simulation for `actor`.
///
/// Only [`PreconditionGate::check`] creates one, so holding an `Admitted`
/// proves the dry-run happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    actor: Address,
    command: LedgerCommand,
}

impl Admitted {
    pub fn actor(&self) -> &Address {
        &self.actor
    }

    pub fn command(&self) -> &LedgerCommand {
        &self.command
    }

    pub fn into_command(self) -> LedgerCommand {
        self.command
    }
}

#[derive(Clone)]
pub struct PreconditionGate {
    ledger: Arc<dyn LedgerClient>,
}

impl PreconditionGate {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    pub async fn check(&self, actor: &Address, command: LedgerCommand) -> Result<Admitted> {
        match self.ledger.simulate(actor, &command).await {
            Ok(()) => Ok(Admitted {
                actor: actor.clone(),
                command,
            }),
            Err(err) => match err.kind {
                LedgerErrorKind::Reverted | LedgerErrorKind::Rejected | LedgerErrorKind::NotFound => {
                    let subject = command
                        .asset_id()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| command.kind().to_string());
                    tracing::warn!(
                        actor = %actor,
                        op = %command.kind(),
                        "Dry-run rejected {}: {}",
                        subject,
                        err.message
                    );
                    Err(EngineError::PreconditionViolation {
                        asset: subject,
                        reason: err.message,
                    })
                }
                _ => Err(EngineError::from_read(err)),
            },
        }
    }
}
