// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! File exports of reconciled passports.
//!
//! `exported_at` is the only wall-clock input and stays outside the
//! reconciled history, so two exports of the same ledger state differ only
//! in that field.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

use passport_kernel::{AssetEvent, AssetId, AssetSnapshot, BatchId};

use crate::errors::Result;
use crate::mirror::rfc3339;
use crate::sync::ReconciledPassport;

pub const CSV_HEADER: [&str; 5] = ["timestamp", "eventType", "actor", "offchainHashPrefix", "offchainURI"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedEvent<'a> {
    block_height: u64,
    log_index: u32,
    tx_ref: &'a str,
    timestamp: String,
    sequence_no: u64,
    asset_id: &'a str,
    batch_id: &'a str,
    event_type: &'a str,
    offchain_hash: String,
    #[serde(rename = "offchainURI")]
    offchain_uri: &'a str,
    actor: &'a str,
    owner_after: &'a str,
    state_after: &'static str,
}

impl<'a> From<&'a AssetEvent> for ExportedEvent<'a> {
    fn from(e: &'a AssetEvent) -> Self {
        Self {
            block_height: e.block_height,
            log_index: e.log_index,
            tx_ref: e.tx_ref.as_str(),
            timestamp: rfc3339(e.timestamp),
            sequence_no: e.sequence_no,
            asset_id: e.asset_id.as_str(),
            batch_id: e.batch_id.as_str(),
            event_type: &e.event_type,
            offchain_hash: e.offchain_hash.to_hex(),
            offchain_uri: &e.offchain_uri,
            actor: e.actor.as_str(),
            owner_after: e.owner_after.as_str(),
            state_after: e.state_after.label(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchEntry<'a> {
    asset_id: &'a str,
    owner: &'a str,
    state: &'static str,
    history_length: u64,
}

fn exported_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn snapshot_json(s: &AssetSnapshot) -> serde_json::Value {
    json!({
        "assetId": s.asset_id,
        "batchId": s.batch_id,
        "owner": s.owner,
        "state": s.state.label(),
        "historyLength": s.history_length,
    })
}

/// `{program, exportedAt, snapshot, events, digest, lengthMismatch}`.
pub fn passport_document(program: &str, passport: &ReconciledPassport, at: DateTime<Utc>) -> serde_json::Value {
    let events: Vec<ExportedEvent> = passport.history.iter().map(ExportedEvent::from).collect();
    let mismatch = passport.length_mismatch.map(|m| {
        json!({ "ledger": m.ledger, "reconciled": m.reconciled })
    });
    json!({
        "program": program,
        "exportedAt": exported_at(at),
        "snapshot": snapshot_json(&passport.snapshot),
        "events": events,
        "digest": passport.digest,
        "lengthMismatch": mismatch,
    })
}

pub fn batch_index(program: &str, batch: &BatchId, snapshots: &[AssetSnapshot], at: DateTime<Utc>) -> serde_json::Value {
    let assets: Vec<BatchEntry> = snapshots
        .iter()
        .map(|s| BatchEntry {
            asset_id: s.asset_id.as_str(),
            owner: s.owner.as_str(),
            state: s.state.label(),
            history_length: s.history_length,
        })
        .collect();
    json!({
        "program": program,
        "batchId": batch,
        "exportedAt": exported_at(at),
        "assets": assets,
    })
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_line<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(csv_field).collect::<Vec<_>>().join(",")
}

/// History as CSV, every field quoted.
pub fn history_csv(history: &[AssetEvent]) -> String {
    let mut out = csv_line(CSV_HEADER);
    out.push('\n');
    for e in history {
        let timestamp = rfc3339(e.timestamp);
        let prefix = e.offchain_hash.prefix();
        out.push_str(&csv_line([
            timestamp.as_str(),
            e.event_type.as_str(),
            e.actor.as_str(),
            prefix.as_str(),
            e.offchain_uri.as_str(),
        ]));
        out.push('\n');
    }
    out
}

/// Keeps file names inside the export directory whatever the id contains.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

pub struct Exporter {
    dir: PathBuf,
    program: String,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            program: program.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, name: String, contents: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, contents)?;
        tracing::info!(path = %path.display(), "Exported");
        Ok(path)
    }

    pub fn write_passport(&self, passport: &ReconciledPassport) -> Result<PathBuf> {
        let doc = passport_document(&self.program, passport, Utc::now());
        let body = serde_json::to_vec_pretty(&doc).map_err(std::io::Error::from)?;
        self.write(format!("passport_{}.json", file_stem(passport.asset_id().as_str())), &body)
    }

    pub fn write_batch_index(&self, batch: &BatchId, snapshots: &[AssetSnapshot]) -> Result<PathBuf> {
        let doc = batch_index(&self.program, batch, snapshots, Utc::now());
        let body = serde_json::to_vec_pretty(&doc).map_err(std::io::Error::from)?;
        self.write(format!("batch_{}.json", file_stem(batch.as_str())), &body)
    }

    pub fn write_history_csv(&self, asset: &AssetId, history: &[AssetEvent]) -> Result<PathBuf> {
        self.write(format!("history_{}.csv", file_stem(asset.as_str())), history_csv(history).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_every_field() {
        assert_eq!(csv_line(["a", "b\"c"]), "\"a\",\"b\"\"c\"");
        assert_eq!(history_csv(&[]).trim_end(), csv_line(CSV_HEADER));
    }

    #[test]
    fn file_stems_stay_flat() {
        assert_eq!(file_stem("../T-1"), ".._T-1");
        assert_eq!(file_stem("TYRE-0001"), "TYRE-0001");
    }
}
