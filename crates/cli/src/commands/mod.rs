pub mod batch;
pub mod export;
pub mod history;
pub mod inspect;
pub mod mirror;
pub mod role;
pub mod upload;
pub mod write;

use std::path::Path;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use passport_kernel::{AssetSnapshot, OffchainHash};
use passport_node::orchestrator::BatchReport;

/// `--hash` wins over `--document`; with neither the hash is zero.
pub fn offchain_hash(hash: Option<&str>, document: Option<&Path>) -> anyhow::Result<OffchainHash> {
    match (hash, document) {
        (Some(h), _) => Ok(OffchainHash::parse(h)?),
        (None, Some(path)) => {
            let body = std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            Ok(OffchainHash::of_document(&body))
        }
        (None, None) => Ok(OffchainHash::ZERO),
    }
}

pub fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn snapshot_row(s: &AssetSnapshot) -> Vec<String> {
    vec![
        s.asset_id.to_string(),
        s.batch_id.to_string(),
        s.owner.to_string(),
        s.state.label().to_string(),
        s.history_length.to_string(),
    ]
}

pub fn print_report(report: &BatchReport) {
    let mut t = table(vec!["Asset", "Outcome", "Detail", "Follow-up", "Mirror"]);
    for o in &report.outcomes {
        let step = |r: Option<String>| r.unwrap_or_else(|| "-".to_string());
        t.add_row(vec![
            o.asset_id.to_string(),
            o.status.label().to_string(),
            o.detail(),
            step(o.follow_up.as_ref().map(|r| match r {
                Ok(tx) => tx.to_string(),
                Err(e) => format!("FAILED: {}", e),
            })),
            step(o.mirror.as_ref().map(|r| match r {
                Ok(()) => "ok".to_string(),
                Err(e) => format!("FAILED: {}", e),
            })),
        ]);
    }
    println!("{t}");
    println!(
        "{} succeeded, {} skipped, {} failed\n",
        report.succeeded(),
        report.skipped(),
        report.failed()
    );
}
