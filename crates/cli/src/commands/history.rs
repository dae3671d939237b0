use passport_kernel::AssetId;
use passport_node::mirror::rfc3339;

use super::table;
use crate::engine::PassportEngine;

pub async fn run(engine: &PassportEngine, asset: &AssetId, write_csv: bool) -> anyhow::Result<()> {
    let passport = engine.sync().passport(asset).await?;

    let mut t = table(vec!["Seq", "Timestamp", "Event", "Actor", "Hash", "URI", "Block"]);
    for e in &passport.history {
        t.add_row(vec![
            e.sequence_no.to_string(),
            rfc3339(e.timestamp),
            e.event_type.clone(),
            e.actor.to_string(),
            e.offchain_hash.prefix(),
            e.offchain_uri.clone(),
            format!("{}:{}", e.block_height, e.log_index),
        ]);
    }

    println!("\nHistory of {} (owner {}, {})\n", asset, passport.snapshot.owner, passport.snapshot.state);
    println!("{t}\n");
    println!("Digest: {}", passport.digest);

    if let Some(m) = passport.length_mismatch {
        println!(
            "\n⚠️  WARNING: ledger reports {} events, reconciled {}.\n",
            m.ledger, m.reconciled
        );
    }

    if write_csv {
        let path = engine.exporter().write_history_csv(asset, &passport.history)?;
        println!("CSV written to {}", path.display());
    }
    Ok(())
}
