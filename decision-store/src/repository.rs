//! Storage seams for decisions and audit entries.
//!
//! The hosting application's record store sits behind these traits. A
//! backend must offer insert with unique-key conflict detection, lookup by
//! decision id, and lookup by the (content hash, policy version) pair.

use async_trait::async_trait;
use serde::Serialize;
use verdict::{AuditEntry, ContentFingerprint, Decision, DecisionId, PolicyVersion, Status};

use crate::error::StoreError;

/// Decision table.
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    /// Find the decision issued for this content under this policy.
    async fn find_by_content(
        &self,
        content_hash: &ContentFingerprint,
        policy_version: &PolicyVersion,
    ) -> Result<Option<Decision>, StoreError>;

    async fn find_by_id(&self, decision_id: &DecisionId) -> Result<Option<Decision>, StoreError>;

    /// Insert a new decision.
    ///
    /// Returns [`StoreError::Conflict`] when the decision id already exists;
    /// the stored record is left untouched.
    async fn insert(&self, decision: &Decision) -> Result<(), StoreError>;

    async fn counts(&self) -> Result<DecisionCounts, StoreError>;
}

/// Append-only gate log.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Most recent entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError>;

    /// Every entry that referenced a decision, oldest first.
    async fn by_decision(&self, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}

/// Decision totals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecisionCounts {
    pub total: u64,
    pub pass: u64,
    pub hold: u64,
    pub block: u64,
}

impl DecisionCounts {
    pub fn add(&mut self, status: Status, n: u64) {
        self.total += n;
        match status {
            Status::Pass => self.pass += n,
            Status::Hold => self.hold += n,
            Status::Block => self.block += n,
        }
    }
}
