//! Audit trail for gate invocations.
//!
//! Every gate check records one entry, cache hits included. Recording is
//! fire-and-forget: [`AuditSink::record`] returns immediately and reports
//! nothing back, so an audit outage cannot change what a gate enforces.
//!
//! The default sink buffers entries on a bounded channel that a single
//! writer task drains into an [`AuditRepository`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use verdict::{AuditEntry, DecisionId, GateType};

use crate::repository::AuditRepository;

/// Default capacity of the audit buffer.
pub const DEFAULT_AUDIT_BUFFER: usize = 1024;

/// Destination for gate audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, gate_type: GateType, subject_id: &str, decision_id: &DecisionId);
}

enum AuditCommand {
    Append(AuditEntry),
    Flush(oneshot::Sender<()>),
}

/// Channel-backed sink with a dedicated writer task.
#[derive(Clone)]
pub struct BufferedAuditSink {
    tx: mpsc::Sender<AuditCommand>,
    dropped: Arc<AtomicU64>,
}

/// Handle to the writer task spawned by [`BufferedAuditSink::spawn`].
pub struct AuditWriter {
    handle: JoinHandle<u64>,
}

impl AuditWriter {
    /// Wait for the writer to drain and exit. Resolves once every sink
    /// clone has been dropped; returns the number of entries written.
    pub async fn join(self) -> u64 {
        match self.handle.await {
            Ok(written) => written,
            Err(e) => {
                error!(error = %e, "Audit writer task failed");
                0
            }
        }
    }
}

impl BufferedAuditSink {
    /// Start the writer task. Must be called inside a Tokio runtime.
    pub fn spawn(repo: Arc<dyn AuditRepository>, capacity: usize) -> (Self, AuditWriter) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_writer(repo, rx));
        let sink = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, AuditWriter { handle })
    }

    /// Wait until every entry recorded before this call has been handed to
    /// the repository.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(AuditCommand::Flush(ack_tx)).await.is_err() {
            warn!("Audit writer is gone, nothing to flush");
            return;
        }
        let _ = ack_rx.await;
    }

    /// Entries discarded because the buffer was full or the writer stopped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl AuditSink for BufferedAuditSink {
    fn record(&self, gate_type: GateType, subject_id: &str, decision_id: &DecisionId) {
        let entry = AuditEntry::new(gate_type, subject_id, decision_id.clone());
        match self.tx.try_send(AuditCommand::Append(entry)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(gate_type = %gate_type, subject_id, decision_id = %decision_id, "Audit buffer full, entry dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                error!(gate_type = %gate_type, subject_id, decision_id = %decision_id, "Audit writer stopped, entry dropped");
            }
        }
    }
}

async fn run_writer(repo: Arc<dyn AuditRepository>, mut rx: mpsc::Receiver<AuditCommand>) -> u64 {
    let mut written = 0u64;
    while let Some(command) = rx.recv().await {
        match command {
            AuditCommand::Append(entry) => match repo.append(&entry).await {
                Ok(()) => written += 1,
                Err(e) => {
                    error!(
                        gate_type = %entry.gate_type,
                        subject_id = %entry.subject_id,
                        decision_id = %entry.decision_id,
                        error = %e,
                        "Failed to insert gate log"
                    );
                }
            },
            AuditCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(written, "Audit writer drained");
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::AuditLog;
    use async_trait::async_trait;
    use verdict::{ContentFingerprint, PolicyVersion};

    fn some_id() -> DecisionId {
        DecisionId::derive(
            &ContentFingerprint::compute("a", "b", "c"),
            &PolicyVersion::default(),
        )
    }

    struct BrokenAudit;

    #[async_trait]
    impl AuditRepository for BrokenAudit {
        async fn append(&self, _entry: &AuditEntry) -> Result<(), StoreError> {
            Err(StoreError::Database("disk full".to_string()))
        }
        async fn recent(&self, _limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
            Ok(vec![])
        }
        async fn by_decision(&self, _id: &DecisionId) -> Result<Vec<AuditEntry>, StoreError> {
            Ok(vec![])
        }
        async fn count(&self) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_buffered_sink_writes_through() {
        let log = Arc::new(AuditLog::new());
        let (sink, writer) = BufferedAuditSink::spawn(log.clone(), 16);

        sink.record(GateType::Comment, "7", &some_id());
        sink.record(GateType::Comment, "8", &some_id());
        sink.flush().await;

        assert_eq!(log.count().await.unwrap(), 2);
        assert_eq!(log.recent(1).await.unwrap()[0].subject_id, "8");

        drop(sink);
        assert_eq!(writer.join().await, 2);
    }

    #[tokio::test]
    async fn test_repository_failure_is_swallowed() {
        let (sink, writer) = BufferedAuditSink::spawn(Arc::new(BrokenAudit), 4);

        sink.record(GateType::Ad, "0", &some_id());
        sink.flush().await;

        drop(sink);
        assert_eq!(writer.join().await, 0);
    }

    #[tokio::test]
    async fn test_closed_writer_counts_drops() {
        let (sink, writer) = BufferedAuditSink::spawn(Arc::new(AuditLog::new()), 4);
        writer.handle.abort();
        let _ = writer.handle.await;

        sink.record(GateType::Feed, "1", &some_id());
        assert_eq!(sink.dropped(), 1);
    }
}
