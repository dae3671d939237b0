use std::path::PathBuf;

use clap::{Parser, Subcommand};
use passport_cli::commands::{self, batch, export, history, inspect, mirror, role, upload, write};
use passport_cli::engine::PassportEngine;
use passport_kernel::{Address, AssetId, BatchId, LifecycleState};
use passport_node::config::NodeConfig;
use passport_node::orchestrator::FollowUp;
use passport_node::telemetry;

fn address(s: &str) -> Result<Address, String> {
    Address::parse(s).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "passport")]
#[command(about = "Tyre passport ledger client: reads, gated writes, batch transitions and mirroring", long_about = None)]
struct Cli {
    /// Ledger JSON-RPC endpoint (overrides PASSPORT_RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Passport program address (overrides PASSPORT_PROGRAM_ADDRESS)
    #[arg(long, global = true)]
    program: Option<String>,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Off-chain document reference shared by event-recording commands.
#[derive(clap::Args)]
struct Document {
    /// Document hash, 0x-prefixed hex (up to 32 bytes)
    #[arg(long)]
    hash: Option<String>,

    /// File whose BLAKE3 digest becomes the document hash
    #[arg(long)]
    document: Option<PathBuf>,

    /// Where the document lives (ipfs://, https://)
    #[arg(long, default_value = "")]
    uri: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one tyre's current passport snapshot
    Snapshot { asset: String },
    /// List a batch's tyres with their snapshots
    Batch { batch: String },
    /// Owner and state of every tyre in a batch
    Owners { batch: String },
    /// Reconciled event history of one tyre
    History {
        asset: String,
        /// Also write history_<asset>.csv to the export directory
        #[arg(long)]
        csv: bool,
    },
    /// Role registered for an address
    Role {
        #[arg(value_parser = address)]
        address: Address,
    },
    /// Mint one tyre into a batch
    Mint {
        #[arg(long, value_parser = address)]
        from: Address,
        asset: String,
        batch: String,
    },
    /// Mint a batch of tyres in one call
    MintBatch {
        #[arg(long, value_parser = address)]
        from: Address,
        batch: String,
        #[arg(required = true)]
        assets: Vec<String>,
    },
    /// Record a lifecycle event on one tyre
    RecordEvent {
        #[arg(long, value_parser = address)]
        from: Address,
        asset: String,
        #[arg(long)]
        event_type: String,
        #[command(flatten)]
        document: Document,
    },
    /// Transfer one tyre to a new owner
    Transfer {
        #[arg(long, value_parser = address)]
        from: Address,
        asset: String,
        #[arg(value_parser = address)]
        to: Address,
    },
    /// Move one tyre forward in its lifecycle
    SetState {
        #[arg(long, value_parser = address)]
        from: Address,
        asset: String,
        state: LifecycleState,
    },
    /// Register roles as the regulator, e.g. 0xabc…=Distributor
    RegisterRoles {
        #[arg(long, value_parser = address)]
        from: Address,
        #[arg(required = true, value_parser = write::parse_role_pair)]
        roles: Vec<(Address, String)>,
    },
    /// Transfer every tyre of a batch owned by --from
    BatchTransfer {
        #[arg(long, value_parser = address)]
        from: Address,
        batch: String,
        #[arg(value_parser = address)]
        to: Address,
    },
    /// Record the same document on every tyre of a batch owned by --from
    BatchRecord {
        #[arg(long, value_parser = address)]
        from: Address,
        batch: String,
        #[arg(long)]
        event_type: String,
        #[command(flatten)]
        document: Document,
    },
    /// Move every tyre of a batch owned by --from to a state
    BatchState {
        #[arg(long, value_parser = address)]
        from: Address,
        batch: String,
        state: LifecycleState,
        /// Record this event type after each state change
        #[arg(long)]
        note_type: Option<String>,
        #[command(flatten)]
        document: Document,
    },
    /// Write passport_<asset>.json and history_<asset>.csv
    Export { asset: String },
    /// Write every passport of a batch plus batch_<batch>.json
    ExportBatch { batch: String },
    /// Replace one tyre's mirror copy
    Mirror { asset: String },
    /// Replace the mirror copy of every tyre in a batch
    MirrorBatch { batch: String },
    /// POST a JSON file to the signed mirror webhook
    Upload {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry();

    let mut cfg = NodeConfig::from_env()?;
    if let Some(url) = cli.rpc_url {
        cfg.rpc_url = url;
    }
    if let Some(program) = cli.program {
        cfg.program_address = Some(program);
    }
    tracing::debug!(rpc = %cfg.rpc_url, "Connecting to ledger gateway");
    let engine = PassportEngine::connect(cfg)?;

    let result = dispatch(&engine, cli.command).await;
    if cli.metrics {
        println!("{}", telemetry::get_metrics());
    }
    result
}

async fn dispatch(engine: &PassportEngine, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Snapshot { asset } => inspect::snapshot(engine, &AssetId::new(asset)).await,
        Commands::Batch { batch } => inspect::batch(engine, &BatchId::new(batch)).await,
        Commands::Owners { batch } => inspect::owners(engine, &BatchId::new(batch)).await,
        Commands::History { asset, csv } => history::run(engine, &AssetId::new(asset), csv).await,
        Commands::Role { address } => role::run(engine, &address).await,
        Commands::Mint { from, asset, batch } => {
            write::mint(engine, from, AssetId::new(asset), BatchId::new(batch)).await
        }
        Commands::MintBatch { from, batch, assets } => {
            let assets = assets.into_iter().map(AssetId::new).collect();
            write::mint_batch(engine, from, BatchId::new(batch), assets).await
        }
        Commands::RecordEvent { from, asset, event_type, document } => {
            let hash = commands::offchain_hash(document.hash.as_deref(), document.document.as_deref())?;
            write::record_event(engine, from, AssetId::new(asset), event_type, hash, document.uri).await
        }
        Commands::Transfer { from, asset, to } => write::transfer(engine, from, AssetId::new(asset), to).await,
        Commands::SetState { from, asset, state } => write::set_state(engine, from, AssetId::new(asset), state).await,
        Commands::RegisterRoles { from, roles } => write::register_roles(engine, from, roles).await,
        Commands::BatchTransfer { from, batch, to } => {
            batch::transfer(engine, from, BatchId::new(batch), to).await.map(|_| ())
        }
        Commands::BatchRecord { from, batch, event_type, document } => {
            let hash = commands::offchain_hash(document.hash.as_deref(), document.document.as_deref())?;
            batch::record(engine, from, BatchId::new(batch), event_type, hash, document.uri)
                .await
                .map(|_| ())
        }
        Commands::BatchState { from, batch, state, note_type, document } => {
            let follow_up = match note_type {
                Some(event_type) => Some(FollowUp {
                    event_type,
                    offchain_hash: commands::offchain_hash(document.hash.as_deref(), document.document.as_deref())?,
                    offchain_uri: document.uri,
                }),
                None => None,
            };
            batch::set_state(engine, from, BatchId::new(batch), state, follow_up)
                .await
                .map(|_| ())
        }
        Commands::Export { asset } => export::asset(engine, &AssetId::new(asset)).await,
        Commands::ExportBatch { batch } => export::batch(engine, &BatchId::new(batch)).await,
        Commands::Mirror { asset } => mirror::asset(engine, &AssetId::new(asset)).await,
        Commands::MirrorBatch { batch } => mirror::batch(engine, &BatchId::new(batch)).await,
        Commands::Upload { file, name } => upload::run(engine, &file, name).await,
    }
}
