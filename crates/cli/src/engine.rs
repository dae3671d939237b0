use std::sync::Arc;

use anyhow::{Context, Result};

use passport_kernel::{Address, LedgerCommand};
use passport_node::config::NodeConfig;
use passport_node::export::Exporter;
use passport_node::gate::PreconditionGate;
use passport_node::ledger::{LedgerClient, RpcLedger};
use passport_node::mirror::{MirrorStore, MirrorWriter, RestMirrorStore};
use passport_node::orchestrator::BatchOrchestrator;
use passport_node::submitter::{ActorSequenceContext, SequencedSubmitter, SubmitPolicy, SubmitReceipt};
use passport_node::sync::HistorySync;
use passport_node::throttle::{FixedDelay, Throttle};
use passport_node::webhook::WebhookClient;

/// Everything a command needs: configuration, the ledger handle and
/// factories for the engine components bound to it.
pub struct PassportEngine {
    pub cfg: NodeConfig,
    program: String,
    ledger: Arc<dyn LedgerClient>,
    store: Option<Arc<dyn MirrorStore>>,
    throttle: Arc<dyn Throttle>,
}

impl PassportEngine {
    /// JSON-RPC ledger at `cfg.rpc_url`.
    pub fn connect(cfg: NodeConfig) -> Result<Self> {
        let program = cfg.require_program()?.to_string();
        let ledger = RpcLedger::new(&cfg.rpc_url, &program, cfg.request_timeout)
            .with_context(|| format!("Failed to build ledger client for {}", cfg.rpc_url))?;
        Ok(Self::with_ledger(cfg, program, Arc::new(ledger)))
    }

    pub fn with_ledger(cfg: NodeConfig, program: impl Into<String>, ledger: Arc<dyn LedgerClient>) -> Self {
        let throttle: Arc<dyn Throttle> = Arc::new(FixedDelay(cfg.throttle));
        Self {
            cfg,
            program: program.into(),
            ledger,
            store: None,
            throttle,
        }
    }

    /// Mirror into `store` instead of the configured REST store.
    pub fn with_store(mut self, store: Arc<dyn MirrorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn ledger(&self) -> Arc<dyn LedgerClient> {
        self.ledger.clone()
    }

    pub fn sync(&self) -> HistorySync {
        HistorySync::new(self.ledger.clone()).with_start_height(self.cfg.start_height)
    }

    /// A fresh sequence context for `actor`, synced from the ledger on first use.
    pub fn submitter(&self, actor: Address) -> SequencedSubmitter {
        SequencedSubmitter::new(
            self.ledger.clone(),
            ActorSequenceContext::new(actor),
            SubmitPolicy::from(&self.cfg),
        )
    }

    /// Batch runs mirror their assets when a store is available.
    pub fn orchestrator(&self) -> BatchOrchestrator {
        let orch = BatchOrchestrator::new(self.ledger.clone(), self.throttle.clone());
        match self.store.clone().or_else(|| self.rest_store().ok()) {
            Some(store) => orch.with_mirror(store),
            None => orch,
        }
    }

    pub fn mirror_writer(&self) -> Result<MirrorWriter<Arc<dyn MirrorStore>>> {
        let store = match self.store.clone() {
            Some(store) => store,
            None => self.rest_store()?,
        };
        Ok(MirrorWriter::new(store))
    }

    fn rest_store(&self) -> Result<Arc<dyn MirrorStore>> {
        let (url, key) = self.cfg.require_store()?;
        let store = RestMirrorStore::new(url, key, self.cfg.request_timeout)?;
        Ok(Arc::new(store))
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(self.cfg.export_dir.clone(), self.program.clone())
    }

    pub fn webhook(&self) -> Result<WebhookClient> {
        Ok(WebhookClient::new(
            self.cfg.mirror_url.as_deref(),
            self.cfg.mirror_key.as_deref(),
            self.cfg.request_timeout,
        )?)
    }

    /// Dry-run then submit one command through `submitter`.
    pub async fn execute(&self, submitter: &mut SequencedSubmitter, command: LedgerCommand) -> Result<SubmitReceipt> {
        let admitted = PreconditionGate::new(self.ledger.clone())
            .check(submitter.actor(), command)
            .await?;
        Ok(submitter.submit(admitted).await?)
    }
}
