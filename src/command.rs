// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Mutating calls understood by the passport program.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::types::enums::LifecycleState;
use crate::types::id::{Address, AssetId, BatchId, OffchainHash};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum LedgerCommand {
    #[serde(rename_all = "camelCase")]
    MintAsset { asset_id: AssetId, batch_id: BatchId },

    #[serde(rename_all = "camelCase")]
    MintBatch { batch_id: BatchId, asset_ids: Vec<AssetId> },

    #[serde(rename_all = "camelCase")]
    RecordEvent {
        asset_id: AssetId,
        event_type: String,
        offchain_hash: OffchainHash,
        #[serde(rename = "offchainURI")]
        offchain_uri: String,
    },

    #[serde(rename_all = "camelCase")]
    TransferOwnership { asset_id: AssetId, new_owner: Address },

    #[serde(rename_all = "camelCase")]
    UpdateState { asset_id: AssetId, new_state: LifecycleState },

    #[serde(rename_all = "camelCase")]
    RegisterRole { address: Address, role: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    MintAsset,
    MintBatch,
    RecordEvent,
    TransferOwnership,
    UpdateState,
    RegisterRole,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::MintAsset => "mintAsset",
            CommandKind::MintBatch => "mintBatch",
            CommandKind::RecordEvent => "recordEvent",
            CommandKind::TransferOwnership => "transferOwnership",
            CommandKind::UpdateState => "updateState",
            CommandKind::RegisterRole => "registerRole",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            LedgerCommand::MintAsset { .. } => CommandKind::MintAsset,
            LedgerCommand::MintBatch { .. } => CommandKind::MintBatch,
            LedgerCommand::RecordEvent { .. } => CommandKind::RecordEvent,
            LedgerCommand::TransferOwnership { .. } => CommandKind::TransferOwnership,
            LedgerCommand::UpdateState { .. } => CommandKind::UpdateState,
            LedgerCommand::RegisterRole { .. } => CommandKind::RegisterRole,
        }
    }

    /// The single asset this command targets, if any.
    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            LedgerCommand::MintAsset { asset_id, .. }
            | LedgerCommand::RecordEvent { asset_id, .. }
            | LedgerCommand::TransferOwnership { asset_id, .. }
            | LedgerCommand::UpdateState { asset_id, .. } => Some(asset_id),
            LedgerCommand::MintBatch { .. } | LedgerCommand::RegisterRole { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_is_tagged_camel_case() {
        let cmd = LedgerCommand::TransferOwnership {
            asset_id: AssetId::new("TIREB01"),
            new_owner: Address::new("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
        };
        let v = serde_json::to_value(&cmd).unwrap();
        assert_eq!(v["op"], "transferOwnership");
        assert_eq!(v["assetId"], "TIREB01");
        assert_eq!(v["newOwner"], "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc");
    }

    #[test]
    fn record_event_carries_uri_field_name() {
        let cmd = LedgerCommand::RecordEvent {
            asset_id: AssetId::new("TIRE001"),
            event_type: "RETREAD".into(),
            offchain_hash: OffchainHash::ZERO,
            offchain_uri: "ipfs://retread_report_TIRE001.pdf".into(),
        };
        let v = serde_json::to_value(&cmd).unwrap();
        assert_eq!(v["offchainURI"], "ipfs://retread_report_TIRE001.pdf");
        assert_eq!(cmd.kind(), CommandKind::RecordEvent);
        assert_eq!(cmd.asset_id().map(|a| a.as_str()), Some("TIRE001"));
    }
}
