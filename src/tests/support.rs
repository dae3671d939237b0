//! Log builders shared by the kernel suites.

use serde_json::json;

use crate::event::{RawLog, ASSET_EVENT};
use crate::types::id::TxRef;

pub const MANUFACTURER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
pub const DISTRIBUTOR: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";

pub fn tyre_log(tire: &str, height: u64, log_index: u32, event_type: &str) -> RawLog {
    RawLog {
        block_height: height,
        log_index,
        tx_ref: TxRef(format!("0x{:064x}", height * 1000 + log_index as u64)),
        event_name: ASSET_EVENT.to_string(),
        fields: json!({
            "tireId": tire,
            "batchId": "BATCH-2025-11-05-B",
            "eventType": event_type,
            "offchainHash": "0x45c3184b",
            "offchainURI": format!("ipfs://{}_{}.pdf", event_type.to_lowercase(), tire),
            "actor": MANUFACTURER,
            "currentOwner": DISTRIBUTOR,
            "state": 1,
            "timestamp": 1_700_000_000u64 + height,
        }),
    }
}
