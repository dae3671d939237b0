use passport_kernel::{AssetId, BatchId};

use super::{snapshot_row, table};
use crate::engine::PassportEngine;

pub async fn snapshot(engine: &PassportEngine, asset: &AssetId) -> anyhow::Result<()> {
    let snap = engine.sync().snapshots().snapshot(asset).await?;

    let mut t = table(vec!["Asset", "Batch", "Owner", "State", "History"]);
    t.add_row(snapshot_row(&snap));
    println!("\nPassport {}\n", asset);
    println!("{t}\n");
    Ok(())
}

/// Batch members with their current snapshots.
pub async fn batch(engine: &PassportEngine, batch: &BatchId) -> anyhow::Result<()> {
    let reader = engine.sync().snapshots().clone();
    let members = reader.batch_members(batch).await?;
    if members.is_empty() {
        println!("\nBatch {} has no members.\n", batch);
        return Ok(());
    }

    let mut t = table(vec!["Asset", "Batch", "Owner", "State", "History"]);
    for asset in &members {
        match reader.snapshot(asset).await {
            Ok(snap) => t.add_row(snapshot_row(&snap)),
            Err(e) => t.add_row(vec![asset.to_string(), batch.to_string(), "ERROR".into(), e.to_string(), "-".into()]),
        };
    }
    println!("\nBatch {} ({} tyres)\n", batch, members.len());
    println!("{t}\n");
    Ok(())
}

/// Owner and state per batch member.
pub async fn owners(engine: &PassportEngine, batch: &BatchId) -> anyhow::Result<()> {
    let reader = engine.sync().snapshots().clone();
    let members = reader.batch_members(batch).await?;

    let mut t = table(vec!["Asset", "Owner", "State"]);
    for asset in &members {
        let snap = reader.snapshot(asset).await?;
        t.add_row(vec![asset.to_string(), snap.owner.to_string(), snap.state.label().to_string()]);
    }
    println!("\nOwners of {}\n", batch);
    println!("{t}\n");
    Ok(())
}
