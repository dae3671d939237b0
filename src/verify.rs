//! Deterministic history hashing.

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::event::AssetEvent;

/// BLAKE3 digest of a reconciled history.
///
/// Covers every field of every event in sequence order, length-prefixing
/// variable-size strings so `["ab", "c"]` and `["a", "bc"]` differ. Two runs
/// over the same ledger logs must produce the same digest.
pub fn history_digest(history: &[AssetEvent]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(history.len() as u64).to_le_bytes());

    for event in history {
        hasher.update(&event.sequence_no.to_le_bytes());
        hasher.update(&event.block_height.to_le_bytes());
        hasher.update(&event.log_index.to_le_bytes());
        hasher.update(&event.timestamp.to_le_bytes());
        update_str(&mut hasher, event.asset_id.as_str());
        update_str(&mut hasher, event.batch_id.as_str());
        update_str(&mut hasher, &event.event_type);
        hasher.update(&event.offchain_hash.0);
        update_str(&mut hasher, &event.offchain_uri);
        update_str(&mut hasher, event.actor.as_str());
        update_str(&mut hasher, event.owner_after.as_str());
        hasher.update(&[event.state_after as u8]);
        update_str(&mut hasher, event.tx_ref.as_str());
    }

    *hasher.finalize().as_bytes()
}

pub fn history_digest_hex(history: &[AssetEvent]) -> String {
    hex::encode(history_digest(history))
}

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u32).to_le_bytes());
    hasher.update(s.as_bytes());
}
