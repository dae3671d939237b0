// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Raw log decoding.
//!
//! Decoding is pure and order-independent. A log that does not carry the
//! expected event name, or whose payload does not have the expected shape,
//! yields a `DecodeError`; callers skip it and keep scanning.

use serde::Deserialize;

use crate::error::DecodeError;
use crate::event::{AssetEvent, RawLog, ASSET_EVENT};
use crate::types::enums::LifecycleState;
use crate::types::id::{Address, AssetId, BatchId, OffchainHash};

/// Payload layout of the passport program's history event.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TyreEventFields {
    tire_id: String,
    batch_id: String,
    event_type: String,
    offchain_hash: String,
    #[serde(rename = "offchainURI", default)]
    offchain_uri: String,
    actor: String,
    current_owner: String,
    state: u8,
    #[serde(default)]
    timestamp: u64,
}

#[derive(Clone, Debug)]
pub struct EventDecoder {
    discriminator: String,
}

/// Outcome of decoding a whole scan: the events that decoded, and the
/// position of every entry that did not.
#[derive(Clone, Debug, Default)]
pub struct DecodedLogs {
    pub events: Vec<AssetEvent>,
    pub skipped: Vec<((u64, u32), DecodeError)>,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new(ASSET_EVENT)
    }
}

impl EventDecoder {
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
        }
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn decode(&self, raw: &RawLog) -> Result<AssetEvent, DecodeError> {
        if raw.event_name != self.discriminator {
            return Err(DecodeError::NameMismatch {
                expected: self.discriminator.clone(),
                found: raw.event_name.clone(),
            });
        }

        let fields: TyreEventFields = serde_json::from_value(raw.fields.clone())
            .map_err(|e| DecodeError::Shape(e.to_string()))?;

        if fields.tire_id.is_empty() {
            return Err(DecodeError::Shape("empty tireId".to_string()));
        }

        let state_after = LifecycleState::try_from(fields.state)?;

        Ok(AssetEvent {
            asset_id: AssetId(fields.tire_id),
            batch_id: BatchId(fields.batch_id),
            event_type: fields.event_type,
            offchain_hash: OffchainHash::parse(&fields.offchain_hash)?,
            offchain_uri: fields.offchain_uri,
            actor: Address::parse(&fields.actor)?,
            owner_after: Address::parse(&fields.current_owner)?,
            state_after,
            sequence_no: 0,
            block_height: raw.block_height,
            log_index: raw.log_index,
            timestamp: fields.timestamp,
            emitted_at: fields.timestamp,
            tx_ref: raw.tx_ref.clone(),
        })
    }

    /// Decodes every entry, collecting failures instead of stopping on them.
    pub fn decode_all<'a, I>(&self, raws: I) -> DecodedLogs
    where
        I: IntoIterator<Item = &'a RawLog>,
    {
        let mut out = DecodedLogs::default();
        for raw in raws {
            match self.decode(raw) {
                Ok(event) => out.events.push(event),
                Err(e) => out.skipped.push((raw.position(), e)),
            }
        }
        out
    }
}
