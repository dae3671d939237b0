// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pacing between ledger writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait Throttle: Send + Sync {
    /// Called between two consecutive assets of a batch.
    async fn pause(&self);
}

/// Sleeps a fixed interval on every pause.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Never waits; counts how often it was asked to.
#[derive(Debug, Default)]
pub struct Unthrottled {
    pauses: AtomicU64,
}

impl Unthrottled {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> u64 {
        self.pauses.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Throttle for Unthrottled {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::Relaxed);
    }
}
