// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod ledger;
pub mod stream;
pub mod snapshot;
pub mod sync;
pub mod gate;
pub mod submitter;
pub mod throttle;
pub mod mirror;
pub mod orchestrator;
pub mod export;
pub mod webhook;
pub mod telemetry;
