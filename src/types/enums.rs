// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Lifecycle enums.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Linear lifecycle of a tracked tyre.
///
/// The ledger owns transition legality. The engine only reads this value
/// back; it never derives a state on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum LifecycleState {
    Manufactured = 0,
    InMarket = 1,
    InService = 2,
    Collected = 3,
    Recycled = 4,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::Manufactured,
        LifecycleState::InMarket,
        LifecycleState::InService,
        LifecycleState::Collected,
        LifecycleState::Recycled,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(LifecycleState::Manufactured),
            1 => Some(LifecycleState::InMarket),
            2 => Some(LifecycleState::InService),
            3 => Some(LifecycleState::Collected),
            4 => Some(LifecycleState::Recycled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Manufactured => "MANUFACTURED",
            LifecycleState::InMarket => "IN_MARKET",
            LifecycleState::InService => "IN_SERVICE",
            LifecycleState::Collected => "COLLECTED",
            LifecycleState::Recycled => "RECYCLED",
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Manufactured
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<LifecycleState> for u8 {
    fn from(s: LifecycleState) -> u8 {
        s as u8
    }
}

impl TryFrom<u8> for LifecycleState {
    type Error = KernelError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        LifecycleState::from_u8(v).ok_or_else(|| KernelError::UnknownState(v.to_string()))
    }
}

/// Accepts either the label (`IN_SERVICE`, case-insensitive) or the numeric code.
impl FromStr for LifecycleState {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<u8>() {
            return LifecycleState::try_from(code);
        }
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        LifecycleState::ALL
            .iter()
            .copied()
            .find(|st| st.label() == wanted)
            .ok_or_else(|| KernelError::UnknownState(s.to_string()))
    }
}
