use passport_kernel::{AssetId, BatchId};
use passport_node::sync::{Checkpoint, SyncOutcome};

use super::table;
use crate::engine::PassportEngine;

fn print_outcomes(outcomes: &[SyncOutcome]) -> usize {
    let mut t = table(vec!["Asset", "Events", "Owner", "Result"]);
    let mut failed = 0;
    for o in outcomes {
        match &o.result {
            Ok(p) => {
                let result = match p.length_mismatch {
                    Some(m) => format!("mirrored (ledger count {} ≠ {})", m.ledger, m.reconciled),
                    None => "mirrored".to_string(),
                };
                t.add_row(vec![
                    o.asset_id.to_string(),
                    p.history.len().to_string(),
                    p.snapshot.owner.to_string(),
                    result,
                ]);
            }
            Err(e) => {
                failed += 1;
                t.add_row(vec![o.asset_id.to_string(), "-".into(), "-".into(), format!("FAILED: {}", e)]);
            }
        }
    }
    println!("{t}\n");
    failed
}

pub async fn asset(engine: &PassportEngine, asset: &AssetId) -> anyhow::Result<()> {
    let writer = engine.mirror_writer()?;
    let outcomes = engine
        .sync()
        .mirror(&writer, std::slice::from_ref(asset), &mut Checkpoint::default())
        .await?;
    print_outcomes(&outcomes);
    Ok(())
}

pub async fn batch(engine: &PassportEngine, batch: &BatchId) -> anyhow::Result<()> {
    let writer = engine.mirror_writer()?;
    let outcomes = engine
        .sync()
        .mirror_batch(&writer, batch, &mut Checkpoint::default())
        .await?;
    let failed = print_outcomes(&outcomes);
    println!("{} mirrored, {} failed", outcomes.len() - failed, failed);
    Ok(())
}
