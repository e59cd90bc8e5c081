//! In-memory backends.
//!
//! Used for tests and for hosts that run without a database. Uniqueness of
//! the decision id is enforced through the map's entry API, so concurrent
//! inserts of the same id still yield exactly one winner.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use verdict::{AuditEntry, ContentFingerprint, Decision, DecisionId, GateType, PolicyVersion};

use crate::error::StoreError;
use crate::repository::{AuditRepository, DecisionCounts, DecisionRepository};

/// Decision table kept in a concurrent map.
#[derive(Default)]
pub struct MemoryDecisionRepository {
    decisions: DashMap<DecisionId, Decision>,
    /// (content hash, policy version) index
    by_content: DashMap<(ContentFingerprint, PolicyVersion), DecisionId>,
}

impl MemoryDecisionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

#[async_trait]
impl DecisionRepository for MemoryDecisionRepository {
    async fn find_by_content(
        &self,
        content_hash: &ContentFingerprint,
        policy_version: &PolicyVersion,
    ) -> Result<Option<Decision>, StoreError> {
        let key = (content_hash.clone(), policy_version.clone());
        let Some(id) = self.by_content.get(&key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.decisions.get(&id).map(|d| d.clone()))
    }

    async fn find_by_id(&self, decision_id: &DecisionId) -> Result<Option<Decision>, StoreError> {
        Ok(self.decisions.get(decision_id).map(|d| d.clone()))
    }

    async fn insert(&self, decision: &Decision) -> Result<(), StoreError> {
        match self.decisions.entry(decision.decision_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(decision.decision_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(decision.clone());
                self.by_content.insert(
                    (decision.content_hash.clone(), decision.policy_version.clone()),
                    decision.decision_id.clone(),
                );
                Ok(())
            }
        }
    }

    async fn counts(&self) -> Result<DecisionCounts, StoreError> {
        let mut counts = DecisionCounts::default();
        for decision in self.decisions.iter() {
            counts.add(decision.status, 1);
        }
        Ok(counts)
    }
}

/// Audit log held in memory (newest first). Entry ids start at 1 and
/// follow append order, as the SQLite rowid does.
pub struct AuditLog {
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Entries recorded for one gate surface.
    pub async fn by_gate(&self, gate_type: GateType, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.gate_type == gate_type)
            .take(limit)
            .cloned()
            .collect()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditRepository for AuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let mut entry = entry.clone();
        entry.entry_id = Some(entries.len() as u64 + 1);
        entries.push_front(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().take(limit).cloned().collect())
    }

    async fn by_decision(&self, decision_id: &DecisionId) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|e| &e.decision_id == decision_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.len() as u64)
    }
}
