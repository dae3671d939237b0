// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Sequenced submission for one actor.
//!
//! # Invariants
//! - One [`ActorSequenceContext`] per actor per run, owned by exactly one
//!   [`SequencedSubmitter`]; submissions from it are strictly sequential
//! - A write carries a fixed resource ceiling, never an estimate
//! - Only `SequenceConflict` is retried, exactly once, after a fixed delay
//! - A successful call advances the context by exactly one, however many
//!   attempts it took

use std::sync::Arc;
use std::time::{Duration, Instant};

use passport_kernel::{Address, TxRef};

use crate::config::NodeConfig;
use crate::errors::{EngineError, Result};
use crate::gate::Admitted;
use crate::ledger::{LedgerClient, LedgerError, LedgerErrorKind, Submission};

/// Next valid sequence number for one actor.
///
/// Lazily synced from the ledger on first use and after a conflict; advanced
/// locally after every accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorSequenceContext {
    actor: Address,
    next: Option<u64>,
    accepted: u64,
}

impl ActorSequenceContext {
    pub fn new(actor: Address) -> Self {
        Self {
            actor,
            next: None,
            accepted: 0,
        }
    }

    /// Starts from a known sequence number instead of asking the ledger.
    pub fn starting_at(actor: Address, next: u64) -> Self {
        Self {
            actor,
            next: Some(next),
            accepted: 0,
        }
    }

    pub fn actor(&self) -> &Address {
        &self.actor
    }

    pub fn next(&self) -> Option<u64> {
        self.next
    }

    /// Submissions accepted through this context.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitPolicy {
    pub gas_limit: u64,
    pub retry_delay: Duration,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self::from(&NodeConfig::default())
    }
}

impl From<&NodeConfig> for SubmitPolicy {
    fn from(cfg: &NodeConfig) -> Self {
        Self {
            gas_limit: cfg.gas_limit,
            retry_delay: cfg.retry_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub tx_ref: TxRef,
    pub block_height: u64,
    pub sequence: u64,
    pub attempts: u32,
}

pub struct SequencedSubmitter {
    ledger: Arc<dyn LedgerClient>,
    context: ActorSequenceContext,
    policy: SubmitPolicy,
}

impl SequencedSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, context: ActorSequenceContext, policy: SubmitPolicy) -> Self {
        Self {
            ledger,
            context,
            policy,
        }
    }

    pub fn actor(&self) -> &Address {
        &self.context.actor
    }

    pub fn context(&self) -> &ActorSequenceContext {
        &self.context
    }

    pub fn into_context(self) -> ActorSequenceContext {
        self.context
    }

    /// Submits an admitted command and waits for durable acceptance.
    pub async fn submit(&mut self, admitted: Admitted) -> Result<SubmitReceipt> {
        if admitted.actor() != &self.context.actor {
            return Err(EngineError::config(format!(
                "command admitted for {} handed to the submitter of {}",
                admitted.actor(),
                self.context.actor
            )));
        }
        let command = admitted.into_command();
        let kind = command.kind();
        let start = Instant::now();

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let sequence = self.sequence().await?;
            let submission = Submission {
                actor: self.context.actor.clone(),
                sequence,
                gas_limit: self.policy.gas_limit,
                command: command.clone(),
            };

            metrics::counter!("passport_submissions_total", 1, "op" => kind.as_str());
            match self.send(&submission).await {
                Ok((tx_ref, block_height)) => {
                    self.context.next = Some(sequence + 1);
                    self.context.accepted += 1;
                    metrics::histogram!("passport_submit_duration_seconds", start.elapsed().as_secs_f64());
                    tracing::info!(
                        actor = %self.context.actor,
                        op = %kind,
                        sequence,
                        attempts,
                        tx = %tx_ref,
                        "Submission accepted at height {}",
                        block_height
                    );
                    return Ok(SubmitReceipt {
                        tx_ref,
                        block_height,
                        sequence,
                        attempts,
                    });
                }
                Err(err) if err.kind == LedgerErrorKind::SequenceConflict && attempts == 1 => {
                    metrics::counter!("passport_submission_retries_total", 1);
                    tracing::warn!(
                        actor = %self.context.actor,
                        sequence,
                        "Sequence conflict, retrying once in {:?}",
                        self.policy.retry_delay
                    );
                    // The ledger is the only authority on what was consumed.
                    self.context.next = None;
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(err) => {
                    let exhausted = err.kind == LedgerErrorKind::SequenceConflict;
                    if exhausted {
                        self.context.next = None;
                    }
                    metrics::counter!("passport_submission_failures_total", 1, "op" => kind.as_str());
                    tracing::error!(
                        actor = %self.context.actor,
                        op = %kind,
                        sequence,
                        attempts,
                        "Submission failed: {}",
                        err
                    );
                    if exhausted {
                        return Err(EngineError::Submission(err));
                    }
                    return Err(EngineError::from_submit(err));
                }
            }
        }
    }

    async fn sequence(&mut self) -> Result<u64> {
        if let Some(next) = self.context.next {
            return Ok(next);
        }
        let next = self
            .ledger
            .next_sequence(&self.context.actor)
            .await
            .map_err(EngineError::from_read)?;
        self.context.next = Some(next);
        Ok(next)
    }

    async fn send(&mut self, submission: &Submission) -> std::result::Result<(TxRef, u64), LedgerError> {
        let tx_ref = self.ledger.submit(submission).await?;
        let receipt = self.ledger.await_receipt(&tx_ref).await?;
        if !receipt.accepted {
            // Included but failed: the sequence number is spent all the same.
            self.context.next = Some(submission.sequence + 1);
            return Err(LedgerError::new(
                LedgerErrorKind::Reverted,
                format!("transaction {} failed during execution", receipt.tx_ref),
            ));
        }
        Ok((receipt.tx_ref, receipt.block_height))
    }
}
