//! Shared judgment path for every gate adapter.
//!
//! An adapter hands its extracted `(title, body, source_url)` to
//! [`GateContext::check`], which decides, looks the decision up and records
//! the invocation in the audit log before returning a [`Judgment`].
//! Adapters whose audit tag depends on the outcome call
//! [`GateContext::judge`] and [`GateContext::record`] separately.
//!
//! When the decision cannot be read back the judgment enforces as
//! [`Status::Block`]: adapters fail closed. The audit write is fire-and-forget
//! and never changes the outcome.

use decision_store::{AuditSink, DecisionStore};
use std::sync::Arc;
use tracing::{debug, warn};
use verdict::{ContentType, Decision, DecisionId, DecisionView, GateType, Status};

/// Result of one gate check.
#[derive(Debug, Clone)]
pub struct Judgment {
    pub decision_id: DecisionId,
    pub decision: Option<Decision>,
}

impl Judgment {
    /// Status the adapter must enforce. A missing decision enforces as BLOCK.
    pub fn enforced_status(&self) -> Status {
        self.decision
            .as_ref()
            .map(|d| d.status)
            .unwrap_or(Status::Block)
    }

    pub fn is_missing(&self) -> bool {
        self.decision.is_none()
    }

    pub fn view(&self) -> Option<DecisionView> {
        self.decision.as_ref().map(Decision::view)
    }
}

/// Store and audit sink shared by every adapter.
#[derive(Clone)]
pub struct GateContext {
    store: Arc<DecisionStore>,
    audit: Arc<dyn AuditSink>,
}

impl GateContext {
    pub fn new(store: Arc<DecisionStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &Arc<DecisionStore> {
        &self.store
    }

    /// Decide, look up and audit.
    pub async fn check(
        &self,
        gate_type: GateType,
        subject_id: &str,
        title: &str,
        body: &str,
        source_url: &str,
    ) -> Judgment {
        let judgment = self
            .judge(gate_type.content_type(), subject_id, title, body, source_url)
            .await;
        self.record(gate_type, subject_id, &judgment.decision_id);
        judgment
    }

    /// Decide and look up without writing an audit entry.
    pub async fn judge(
        &self,
        content_type: ContentType,
        subject_id: &str,
        title: &str,
        body: &str,
        source_url: &str,
    ) -> Judgment {
        let (decision_id, decision) = self.store.judge(content_type, title, body, source_url).await;

        match &decision {
            Some(d) => debug!(
                content_type = %content_type,
                subject_id,
                decision_id = %decision_id,
                status = %d.status,
                "Gate check"
            ),
            None => warn!(
                content_type = %content_type,
                subject_id,
                decision_id = %decision_id,
                "Decision unavailable, failing closed"
            ),
        }

        Judgment {
            decision_id,
            decision,
        }
    }

    /// Fire-and-forget audit entry for one gate invocation.
    pub fn record(&self, gate_type: GateType, subject_id: &str, decision_id: &DecisionId) {
        self.audit.record(gate_type, subject_id, decision_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verdict::{ContentFingerprint, PolicyVersion};

    fn judgment(decision: Option<Decision>) -> Judgment {
        let fingerprint = ContentFingerprint::compute("t", "b", "u");
        Judgment {
            decision_id: DecisionId::derive(&fingerprint, &PolicyVersion::default()),
            decision,
        }
    }

    #[test]
    fn test_missing_decision_enforces_block() {
        let missing = judgment(None);
        assert!(missing.is_missing());
        assert_eq!(missing.enforced_status(), Status::Block);
        assert!(missing.view().is_none());
    }

    #[test]
    fn test_present_decision_enforces_its_status() {
        let decision = Decision::issue(
            ContentType::Post,
            ContentFingerprint::compute("t", "b", "u"),
            PolicyVersion::default(),
            verdict::evaluate("Launch", "It ships in 3 days.", ""),
            Utc::now(),
        );
        let present = judgment(Some(decision));
        assert_eq!(present.enforced_status(), Status::Pass);
        assert_eq!(present.view().unwrap().decision, Status::Pass);
    }
}
