//! Identity types.

use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{KernelError, KernelResult};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            pub fn new(s: impl Into<String>) -> Self {
                $ty(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                $ty(s.to_string())
            }
        }
    };
}

string_id!(AssetId);
string_id!(BatchId);
string_id!(TxRef);

/// Ledger account address.
///
/// Stored lowercased so ownership checks are case-insensitive, the way the
/// ledger itself compares accounts.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Accepts any string; use [`Address::parse`] for operator input.
    pub fn new(s: impl AsRef<str>) -> Self {
        Address(s.as_ref().trim().to_ascii_lowercase())
    }

    /// `0x` followed by 40 hex digits.
    pub fn parse(s: &str) -> KernelResult<Self> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| KernelError::InvalidAddress(s.to_string()))?;
        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KernelError::InvalidAddress(s.to_string()));
        }
        Ok(Address::new(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address::new(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-byte digest of an off-ledger document, rendered as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OffchainHash(pub [u8; 32]);

impl OffchainHash {
    pub const ZERO: OffchainHash = OffchainHash([0u8; 32]);

    /// Left-pads `bytes` with zeros to 32 bytes. Longer inputs keep their tail.
    pub fn zero_padded(bytes: &[u8]) -> Self {
        let mut out = [0u8; 32];
        let take = bytes.len().min(32);
        out[32 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
        OffchainHash(out)
    }

    /// Digest of a document body.
    pub fn of_document(body: &[u8]) -> Self {
        OffchainHash(blake3::hash(body).into())
    }

    pub fn parse(s: &str) -> KernelResult<Self> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|_| KernelError::InvalidHash(s.to_string()))?;
        if bytes.len() > 32 {
            return Err(KernelError::InvalidHash(s.to_string()));
        }
        Ok(Self::zero_padded(&bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// First ten characters of the hex rendering followed by an ellipsis.
    pub fn prefix(&self) -> String {
        let full = self.to_hex();
        format!("{}…", &full[..10])
    }
}

impl fmt::Debug for OffchainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OffchainHash({})", self.to_hex())
    }
}

impl fmt::Display for OffchainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for OffchainHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for OffchainHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        OffchainHash::parse(&s).map_err(serde::de::Error::custom)
    }
}
