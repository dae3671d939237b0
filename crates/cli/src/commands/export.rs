use passport_kernel::{AssetId, BatchId};
use passport_node::sync::Checkpoint;

use crate::engine::PassportEngine;

/// `passport_<id>.json` and `history_<id>.csv`.
pub async fn asset(engine: &PassportEngine, asset: &AssetId) -> anyhow::Result<()> {
    let passport = engine.sync().passport(asset).await?;
    let exporter = engine.exporter();
    let json = exporter.write_passport(&passport)?;
    let csv = exporter.write_history_csv(asset, &passport.history)?;
    println!("Exported {} events to {} and {}", passport.history.len(), json.display(), csv.display());
    Ok(())
}

/// One passport document per member plus the `batch_<id>.json` index.
pub async fn batch(engine: &PassportEngine, batch: &BatchId) -> anyhow::Result<()> {
    let outcomes = engine.sync().batch(batch, &mut Checkpoint::default()).await?;
    let exporter = engine.exporter();

    let mut snapshots = Vec::with_capacity(outcomes.len());
    for o in outcomes {
        match o.result {
            Ok(p) => {
                exporter.write_passport(&p)?;
                snapshots.push(p.snapshot);
            }
            Err(e) => println!("⚠️  {} not exported: {}", o.asset_id, e),
        }
    }
    let index = exporter.write_batch_index(batch, &snapshots)?;
    println!("Exported {} passports, index at {}", snapshots.len(), index.display());
    Ok(())
}
