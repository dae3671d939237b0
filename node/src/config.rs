// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use passport_kernel::BatchId;

use crate::errors::{EngineError, Result};

pub struct NodeConfig {
    pub rpc_url: String,
    pub program_address: Option<String>,
    /// First block the program could have logged at.
    pub start_height: u64,
    pub gas_limit: u64,
    pub retry_delay: Duration,
    pub throttle: Duration,
    pub request_timeout: Duration,
    pub export_dir: PathBuf,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub mirror_url: Option<String>,
    pub mirror_key: Option<String>,
    pub sync_batches: Vec<BatchId>,
    pub sync_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            program_address: None,
            start_height: 0,
            gas_limit: 1_000_000,
            retry_delay: Duration::from_millis(150),
            throttle: Duration::from_millis(75),
            request_timeout: Duration::from_secs(15),
            export_dir: PathBuf::from("mirror"),
            supabase_url: None,
            supabase_service_key: None,
            mirror_url: None,
            mirror_key: None,
            sync_batches: Vec::new(),
            sync_interval: Duration::from_secs(60),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str) -> Result<Option<T>> {
    match var(key) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| EngineError::config(format!("{} is not a valid number: {}", key, v))),
        None => Ok(None),
    }
}

impl NodeConfig {
    /// Defaults overlaid with the process environment, after loading `.env`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Some(v) = var("PASSPORT_RPC_URL") {
            cfg.rpc_url = v;
        }
        cfg.program_address = var("PASSPORT_PROGRAM_ADDRESS");
        if let Some(v) = parsed("PASSPORT_START_HEIGHT")? {
            cfg.start_height = v;
        }
        if let Some(v) = parsed("PASSPORT_GAS_LIMIT")? {
            cfg.gas_limit = v;
        }
        if let Some(v) = parsed("PASSPORT_RETRY_DELAY_MS")? {
            cfg.retry_delay = Duration::from_millis(v);
        }
        if let Some(v) = parsed("PASSPORT_THROTTLE_MS")? {
            cfg.throttle = Duration::from_millis(v);
        }
        if let Some(v) = var("PASSPORT_EXPORT_DIR") {
            cfg.export_dir = PathBuf::from(v);
        }
        cfg.supabase_url = var("SUPABASE_URL");
        cfg.supabase_service_key = var("SUPABASE_SERVICE_KEY");
        cfg.mirror_url = var("MIRROR_URL");
        cfg.mirror_key = var("MIRROR_KEY");
        if let Some(v) = var("PASSPORT_SYNC_BATCHES") {
            cfg.sync_batches = v
                .split(',')
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(BatchId::new)
                .collect();
        }
        if let Some(v) = parsed("PASSPORT_SYNC_INTERVAL_SECS")? {
            cfg.sync_interval = Duration::from_secs(v);
        }
        Ok(cfg)
    }

    pub fn require_program(&self) -> Result<&str> {
        self.program_address
            .as_deref()
            .ok_or_else(|| EngineError::config("PASSPORT_PROGRAM_ADDRESS is not set"))
    }

    /// Supabase URL and service key.
    pub fn require_store(&self) -> Result<(&str, &str)> {
        match (self.supabase_url.as_deref(), self.supabase_service_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            (None, _) => Err(EngineError::config("SUPABASE_URL is not set")),
            (_, None) => Err(EngineError::config("SUPABASE_SERVICE_KEY is not set")),
        }
    }
}
