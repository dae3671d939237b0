#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use passport_kernel::{Address, AssetId, BatchId, LedgerCommand, LifecycleState, OffchainHash};
use passport_node::ledger::memory::ROLE_MANUFACTURER;
use passport_node::ledger::{LedgerClient, MemoryLedger};
use passport_node::submitter::{ActorSequenceContext, SequencedSubmitter, SubmitPolicy};

pub fn addr(n: u8) -> Address {
    Address::new(format!("0x{:040x}", n))
}

pub fn regulator() -> Address {
    addr(0xaa)
}

pub fn manufacturer() -> Address {
    addr(0x01)
}

pub fn distributor() -> Address {
    addr(0x02)
}

pub fn retailer() -> Address {
    addr(0x03)
}

pub fn tyre(n: usize) -> AssetId {
    AssetId::new(format!("TYRE-{:04}", n))
}

pub fn batch() -> BatchId {
    BatchId::new("BATCH-A")
}

/// Ledger with `n` tyres minted by the manufacturer into [`batch`].
pub fn minted(n: usize) -> Arc<MemoryLedger> {
    let ledger = Arc::new(MemoryLedger::new(regulator()));
    ledger.seed_role(&manufacturer(), ROLE_MANUFACTURER);
    ledger
        .seed(
            &manufacturer(),
            LedgerCommand::MintBatch {
                batch_id: batch(),
                asset_ids: (1..=n).map(tyre).collect(),
            },
        )
        .unwrap();
    ledger
}

pub fn record(ledger: &MemoryLedger, actor: &Address, asset: &AssetId, event_type: &str) {
    ledger
        .seed(
            actor,
            LedgerCommand::RecordEvent {
                asset_id: asset.clone(),
                event_type: event_type.to_string(),
                offchain_hash: OffchainHash::of_document(event_type.as_bytes()),
                offchain_uri: format!("ipfs://{}", event_type.to_lowercase()),
            },
        )
        .unwrap();
}

pub fn transfer(ledger: &MemoryLedger, actor: &Address, asset: &AssetId, to: &Address) {
    ledger
        .seed(
            actor,
            LedgerCommand::TransferOwnership {
                asset_id: asset.clone(),
                new_owner: to.clone(),
            },
        )
        .unwrap();
}

pub fn set_state(ledger: &MemoryLedger, actor: &Address, asset: &AssetId, state: LifecycleState) {
    ledger
        .seed(
            actor,
            LedgerCommand::UpdateState {
                asset_id: asset.clone(),
                new_state: state,
            },
        )
        .unwrap();
}

pub fn instant_policy() -> SubmitPolicy {
    SubmitPolicy {
        gas_limit: 1_000_000,
        retry_delay: Duration::ZERO,
    }
}

pub fn submitter(ledger: &Arc<MemoryLedger>, actor: Address) -> SequencedSubmitter {
    let client: Arc<dyn LedgerClient> = ledger.clone();
    SequencedSubmitter::new(client, ActorSequenceContext::new(actor), instant_policy())
}
