//! TrustGate - the set of surface gates sharing one store and audit sink.
//!
//! [`TrustGate`] wires already-built components together and is what tests
//! and embedders construct directly. [`GateRuntime`] builds the components
//! from a [`GateConfig`] and owns the audit writer task.

use decision_store::{
    AuditLog, AuditRepository, AuditSink, AuditWriter, BufferedAuditSink, DecisionRepository,
    DecisionStore, MemoryDecisionRepository, SqliteStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::{AdGate, AutomationGate, CommentGate, FeedGate, PublishGate, RestGate};
use crate::config::{Backend, GateConfig};
use crate::context::GateContext;
use crate::error::GateError;
use crate::memo::{PublishMemo, DEFAULT_MEMO_TTL};
use crate::pipeline::GatePipeline;

/// Every surface gate, sharing one [`GateContext`].
#[derive(Clone)]
pub struct TrustGate {
    ctx: GateContext,
    publish: PublishGate,
    comment: CommentGate,
    feed: FeedGate,
    rest: RestGate,
    automation: AutomationGate,
    ad: AdGate,
}

impl TrustGate {
    pub fn new(store: Arc<DecisionStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self::with_memo_ttl(store, audit, DEFAULT_MEMO_TTL)
    }

    pub fn with_memo_ttl(
        store: Arc<DecisionStore>,
        audit: Arc<dyn AuditSink>,
        memo_ttl: Duration,
    ) -> Self {
        let ctx = GateContext::new(store, audit);
        Self {
            publish: PublishGate::new(ctx.clone(), Arc::new(PublishMemo::new(memo_ttl))),
            comment: CommentGate::new(ctx.clone()),
            feed: FeedGate::new(ctx.clone()),
            rest: RestGate::new(ctx.clone()),
            automation: AutomationGate::new(ctx.clone()),
            ad: AdGate::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &GateContext {
        &self.ctx
    }

    pub fn store(&self) -> &Arc<DecisionStore> {
        self.ctx.store()
    }

    pub fn publish(&self) -> &PublishGate {
        &self.publish
    }

    pub fn comment(&self) -> &CommentGate {
        &self.comment
    }

    pub fn feed(&self) -> &FeedGate {
        &self.feed
    }

    pub fn rest(&self) -> &RestGate {
        &self.rest
    }

    pub fn automation(&self) -> &AutomationGate {
        &self.automation
    }

    pub fn ad(&self) -> &AdGate {
        &self.ad
    }

    /// Automation step followed by ad placement.
    pub fn automation_pipeline(&self) -> GatePipeline {
        GatePipeline::new()
            .then(Arc::new(self.automation.clone()))
            .then(Arc::new(self.ad.clone()))
    }
}

/// A configured gate with its audit writer running.
pub struct GateRuntime {
    gate: TrustGate,
    audit_repo: Arc<dyn AuditRepository>,
    sink: BufferedAuditSink,
    writer: AuditWriter,
}

impl GateRuntime {
    /// Open the configured backend and start the audit writer. Must be
    /// called inside a Tokio runtime.
    pub fn start(config: &GateConfig) -> Result<Self, GateError> {
        config.validate()?;

        let (decisions, audit_repo): (Arc<dyn DecisionRepository>, Arc<dyn AuditRepository>) =
            match config.backend {
                Backend::Sqlite => {
                    let db = Arc::new(SqliteStore::open(&config.storage_dir)?);
                    db.set_busy_timeout(Duration::from_millis(config.store_timeout_ms))?;
                    let decisions: Arc<dyn DecisionRepository> = db.clone();
                    let audit: Arc<dyn AuditRepository> = db;
                    (decisions, audit)
                }
                Backend::Memory => {
                    let decisions: Arc<dyn DecisionRepository> =
                        Arc::new(MemoryDecisionRepository::new());
                    let audit: Arc<dyn AuditRepository> = Arc::new(AuditLog::new());
                    (decisions, audit)
                }
            };

        let store = Arc::new(DecisionStore::with_config(decisions, config.store_config()?));
        let (sink, writer) = BufferedAuditSink::spawn(audit_repo.clone(), config.audit_buffer);
        let gate = TrustGate::with_memo_ttl(store, Arc::new(sink.clone()), config.publish_memo_ttl());

        info!(
            backend = ?config.backend,
            policy_version = %config.policy_version,
            storage_dir = ?config.storage_dir,
            "Content trust gate started"
        );

        Ok(Self {
            gate,
            audit_repo,
            sink,
            writer,
        })
    }

    pub fn gate(&self) -> &TrustGate {
        &self.gate
    }

    pub fn store(&self) -> &Arc<DecisionStore> {
        self.gate.store()
    }

    pub fn audit(&self) -> &Arc<dyn AuditRepository> {
        &self.audit_repo
    }

    /// Wait until recorded audit entries reach the repository.
    pub async fn flush(&self) {
        self.sink.flush().await;
    }

    /// Drain the audit buffer and stop the writer. Clones of the gate held
    /// elsewhere keep the writer alive until they are dropped.
    pub async fn shutdown(self) -> u64 {
        let Self {
            gate, sink, writer, ..
        } = self;
        sink.flush().await;
        let dropped = sink.dropped();
        if dropped > 0 {
            warn!(dropped, "Audit entries were dropped during this run");
        }
        let pending = gate.store().pending_persistence().await;
        if pending > 0 {
            warn!(pending, "Decisions never reached storage");
        }
        drop(gate);
        drop(sink);
        writer.join().await
    }
}
