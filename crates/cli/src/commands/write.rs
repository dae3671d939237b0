//! Single-asset writes. Each one is dry-run first and then submitted from
//! the acting account's own sequence context.

use anyhow::bail;

use passport_kernel::{Address, AssetId, BatchId, LedgerCommand, LifecycleState, OffchainHash};
use passport_node::submitter::SubmitReceipt;

use crate::engine::PassportEngine;

fn report(what: &str, receipt: &SubmitReceipt) {
    println!(
        "{} ✓ tx {} (block {}, sequence {}{})",
        what,
        receipt.tx_ref,
        receipt.block_height,
        receipt.sequence,
        if receipt.attempts > 1 { ", retried" } else { "" }
    );
}

async fn single(engine: &PassportEngine, actor: Address, what: &str, command: LedgerCommand) -> anyhow::Result<()> {
    let mut submitter = engine.submitter(actor);
    let receipt = engine.execute(&mut submitter, command).await?;
    report(what, &receipt);
    Ok(())
}

pub async fn mint(engine: &PassportEngine, actor: Address, asset: AssetId, batch: BatchId) -> anyhow::Result<()> {
    let what = format!("Minted {} in {}", asset, batch);
    single(engine, actor, &what, LedgerCommand::MintAsset { asset_id: asset, batch_id: batch }).await
}

pub async fn mint_batch(engine: &PassportEngine, actor: Address, batch: BatchId, assets: Vec<AssetId>) -> anyhow::Result<()> {
    if assets.is_empty() {
        bail!("mint-batch needs at least one tyre id");
    }
    let what = format!("Minted {} tyres in {}", assets.len(), batch);
    single(engine, actor, &what, LedgerCommand::MintBatch { batch_id: batch, asset_ids: assets }).await
}

pub async fn record_event(
    engine: &PassportEngine,
    actor: Address,
    asset: AssetId,
    event_type: String,
    offchain_hash: OffchainHash,
    offchain_uri: String,
) -> anyhow::Result<()> {
    let what = format!("Recorded {} on {}", event_type, asset);
    let command = LedgerCommand::RecordEvent {
        asset_id: asset,
        event_type,
        offchain_hash,
        offchain_uri,
    };
    single(engine, actor, &what, command).await
}

pub async fn transfer(engine: &PassportEngine, actor: Address, asset: AssetId, to: Address) -> anyhow::Result<()> {
    let what = format!("Transferred {} to {}", asset, to);
    single(engine, actor, &what, LedgerCommand::TransferOwnership { asset_id: asset, new_owner: to }).await
}

pub async fn set_state(engine: &PassportEngine, actor: Address, asset: AssetId, state: LifecycleState) -> anyhow::Result<()> {
    let what = format!("Moved {} to {}", asset, state);
    single(engine, actor, &what, LedgerCommand::UpdateState { asset_id: asset, new_state: state }).await
}

/// Registers several roles in a row from one regulator context.
pub async fn register_roles(engine: &PassportEngine, actor: Address, roles: Vec<(Address, String)>) -> anyhow::Result<()> {
    let mut submitter = engine.submitter(actor);
    for (address, role) in roles {
        let what = format!("Registered {} as {}", address, role);
        let receipt = engine
            .execute(&mut submitter, LedgerCommand::RegisterRole { address, role })
            .await?;
        report(&what, &receipt);
    }
    Ok(())
}

/// `address=Role`.
pub fn parse_role_pair(s: &str) -> Result<(Address, String), String> {
    let (address, role) = s
        .split_once('=')
        .ok_or_else(|| format!("expected address=Role, got {}", s))?;
    let address = Address::parse(address).map_err(|e| e.to_string())?;
    if role.trim().is_empty() {
        return Err(format!("empty role for {}", address));
    }
    Ok((address, role.trim().to_string()))
}
