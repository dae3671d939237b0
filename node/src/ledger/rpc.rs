// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! JSON-RPC ledger gateway client.
//!
//! Writes name the acting account; the gateway holds the keys and signs for
//! it. Error objects carry a numeric code which is mapped to a
//! [`LedgerErrorKind`] here and nowhere else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use passport_kernel::{Address, AssetId, AssetSnapshot, BatchId, LedgerCommand, RawLog, TxRef};

use super::{LedgerClient, LedgerError, LedgerErrorKind, LedgerResult, LogQuery, Receipt, Submission};

pub const CODE_NOT_FOUND: i64 = -32001;
pub const CODE_REVERTED: i64 = -32002;
pub const CODE_SEQUENCE_CONFLICT: i64 = -32003;
pub const CODE_REJECTED: i64 = -32004;
pub const CODE_UNRESOLVED: i64 = -32005;

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

pub fn classify_code(code: i64) -> LedgerErrorKind {
    match code {
        CODE_NOT_FOUND => LedgerErrorKind::NotFound,
        CODE_REVERTED => LedgerErrorKind::Reverted,
        CODE_SEQUENCE_CONFLICT => LedgerErrorKind::SequenceConflict,
        CODE_UNRESOLVED => LedgerErrorKind::Unresolved,
        -32700 | -32600 => LedgerErrorKind::Malformed,
        _ => LedgerErrorKind::Rejected,
    }
}

#[derive(Debug)]
pub struct RpcLedger {
    endpoint: String,
    program: String,
    client: Client,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(endpoint: &str, program: &str, timeout: Duration) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::transport(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            program: program.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> LedgerResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::transport(format!("{}: {}", method, e)))?;

        if !resp.status().is_success() {
            return Err(LedgerError::transport(format!(
                "{} failed: HTTP {}",
                method,
                resp.status()
            )));
        }

        let envelope: RpcEnvelope = resp
            .json()
            .await
            .map_err(|e| LedgerError::malformed(format!("{}: {}", method, e)))?;

        if let Some(err) = envelope.error {
            return Err(LedgerError::new(classify_code(err.code), err.message));
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|e| LedgerError::malformed(format!("{} result: {}", method, e)))
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn resolve_program(&self) -> LedgerResult<()> {
        let deployed: bool = self.call("ledger_resolveProgram", json!([self.program])).await?;
        if deployed {
            Ok(())
        } else {
            Err(LedgerError::new(
                LedgerErrorKind::Unresolved,
                format!("no program deployed at {}", self.program),
            ))
        }
    }

    async fn snapshot(&self, asset: &AssetId) -> LedgerResult<AssetSnapshot> {
        self.call("ledger_getSnapshot", json!([self.program, asset])).await
    }

    async fn batch_members(&self, batch: &BatchId) -> LedgerResult<Vec<AssetId>> {
        self.call("ledger_getBatchMembers", json!([self.program, batch])).await
    }

    async fn role(&self, address: &Address) -> LedgerResult<String> {
        let role: Option<String> = self.call("ledger_getRole", json!([self.program, address])).await?;
        Ok(role.unwrap_or_default())
    }

    async fn logs(&self, query: &LogQuery) -> LedgerResult<Vec<RawLog>> {
        self.call(
            "ledger_getLogs",
            json!([self.program, query.discriminator, query.from_height, query.to_height]),
        )
        .await
    }

    async fn block_time(&self, height: u64) -> LedgerResult<Option<u64>> {
        self.call("ledger_getBlockTime", json!([height])).await
    }

    async fn latest_height(&self) -> LedgerResult<u64> {
        self.call("ledger_latestHeight", json!([])).await
    }

    async fn next_sequence(&self, actor: &Address) -> LedgerResult<u64> {
        self.call("ledger_getSequence", json!([actor])).await
    }

    async fn simulate(&self, actor: &Address, command: &LedgerCommand) -> LedgerResult<()> {
        let _: Value = self
            .call("ledger_simulate", json!([self.program, actor, command]))
            .await?;
        Ok(())
    }

    async fn submit(&self, submission: &Submission) -> LedgerResult<TxRef> {
        self.call(
            "ledger_submit",
            json!([
                self.program,
                submission.actor,
                submission.sequence,
                submission.gas_limit,
                submission.command
            ]),
        )
        .await
    }

    async fn await_receipt(&self, tx: &TxRef) -> LedgerResult<Receipt> {
        self.call("ledger_awaitReceipt", json!([tx])).await
    }
}
