//! Idempotent decide / lookup over a [`DecisionRepository`].
//!
//! `decide` is compute-or-fetch: a decision that already exists for the
//! content fingerprint under the active policy version is returned without
//! scoring. A fresh decision is inserted under its deterministic id; when a
//! concurrent writer wins the insert, the winner's record is read back.
//!
//! Storage trouble never makes `decide` fail. The computed decision id is
//! returned and the decision itself is parked in a bounded in-process
//! fallback so that `lookup` can still serve the true verdict. The next
//! `decide` for the same content retries persisting the parked record.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use verdict::{
    ContentFingerprint, ContentType, Decision, DecisionId, HeuristicScorer, PolicyVersion, Scorer,
};

use crate::error::StoreError;
use crate::repository::{DecisionCounts, DecisionRepository};

/// Tunables for a [`DecisionStore`].
#[derive(Debug, Clone)]
pub struct DecisionStoreConfig {
    /// Ruleset tag stamped on every new decision
    pub policy_version: PolicyVersion,
    /// Per storage call; expiry counts as a persistence failure
    pub op_timeout: Duration,
    /// Decisions kept in memory after a failed insert (0 disables)
    pub fallback_capacity: usize,
}

impl Default for DecisionStoreConfig {
    fn default() -> Self {
        Self {
            policy_version: PolicyVersion::default(),
            op_timeout: Duration::from_millis(2000),
            fallback_capacity: 1024,
        }
    }
}

/// Bounded FIFO of decisions that could not be persisted.
struct FallbackCache {
    capacity: usize,
    inner: Mutex<FallbackInner>,
}

#[derive(Default)]
struct FallbackInner {
    decisions: HashMap<DecisionId, Decision>,
    order: VecDeque<DecisionId>,
}

impl FallbackCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(FallbackInner::default()),
        }
    }

    async fn get(&self, id: &DecisionId) -> Option<Decision> {
        self.inner.lock().await.decisions.get(id).cloned()
    }

    async fn park(&self, decision: Decision) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().await;
        if inner.decisions.contains_key(&decision.decision_id) {
            return;
        }
        while inner.order.len() >= self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.decisions.remove(&evicted);
            }
        }
        inner.order.push_back(decision.decision_id.clone());
        inner.decisions.insert(decision.decision_id.clone(), decision);
    }

    async fn release(&self, id: &DecisionId) {
        let mut inner = self.inner.lock().await;
        if inner.decisions.remove(id).is_some() {
            inner.order.retain(|parked| parked != id);
        }
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.decisions.len()
    }
}

/// The single point of judgment shared by every gate adapter.
pub struct DecisionStore {
    repo: Arc<dyn DecisionRepository>,
    scorer: Arc<dyn Scorer>,
    config: DecisionStoreConfig,
    fallback: FallbackCache,
}

impl DecisionStore {
    /// Store with the default policy version and the heuristic scorer.
    pub fn new(repo: Arc<dyn DecisionRepository>) -> Self {
        Self::with_config(repo, DecisionStoreConfig::default())
    }

    pub fn with_config(repo: Arc<dyn DecisionRepository>, config: DecisionStoreConfig) -> Self {
        Self {
            repo,
            scorer: Arc::new(HeuristicScorer::new()),
            fallback: FallbackCache::new(config.fallback_capacity),
            config,
        }
    }

    /// Replace the scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn policy_version(&self) -> &PolicyVersion {
        &self.config.policy_version
    }

    async fn timed<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.config.op_timeout.as_millis() as u64)),
        }
    }

    /// Compute-or-fetch the decision for this content. Never fails.
    pub async fn decide(
        &self,
        content_type: ContentType,
        title: &str,
        body: &str,
        source_url: &str,
    ) -> DecisionId {
        let content_hash = ContentFingerprint::compute(title, body, source_url);
        let policy_version = &self.config.policy_version;

        match self
            .timed(self.repo.find_by_content(&content_hash, policy_version))
            .await
        {
            Ok(Some(existing)) => {
                debug!(decision_id = %existing.decision_id, content_type = %content_type, "Decision cache hit");
                return existing.decision_id;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, content_hash = %content_hash, "Decision lookup failed, evaluating afresh");
            }
        }

        let decision_id = DecisionId::derive(&content_hash, policy_version);

        // A parked decision keeps its original verdict and issue time.
        let decision = match self.fallback.get(&decision_id).await {
            Some(parked) => parked,
            None => {
                let verdict = self.scorer.evaluate(title, body, source_url);
                Decision::issue(
                    content_type,
                    content_hash,
                    policy_version.clone(),
                    verdict,
                    Utc::now(),
                )
            }
        };

        match self.timed(self.repo.insert(&decision)).await {
            Ok(()) => {
                self.fallback.release(&decision_id).await;
                info!(
                    decision_id = %decision_id,
                    content_type = %content_type,
                    status = %decision.status,
                    reason_code = %decision.reason_code,
                    score = decision.score,
                    "Issued decision"
                );
            }
            Err(StoreError::Conflict(_)) => {
                self.fallback.release(&decision_id).await;
                match self.timed(self.repo.find_by_id(&decision_id)).await {
                    Ok(Some(winner)) => {
                        debug!(decision_id = %winner.decision_id, "Lost insert race, using persisted decision");
                        return winner.decision_id;
                    }
                    Ok(None) => {
                        error!(decision_id = %decision_id, "Insert conflicted but no decision could be read back");
                        self.fallback.park(decision).await;
                    }
                    Err(e) => {
                        error!(decision_id = %decision_id, error = %e, "Failed to read back decision after conflict");
                        self.fallback.park(decision).await;
                    }
                }
            }
            Err(e) => {
                error!(
                    decision_id = %decision_id,
                    status = %decision.status,
                    error = %e,
                    "Failed to persist decision, serving it from memory"
                );
                self.fallback.park(decision).await;
            }
        }

        decision_id
    }

    /// Fetch a decision by id. `None` is an expected answer for stale or
    /// unknown ids.
    pub async fn lookup(&self, decision_id: &DecisionId) -> Option<Decision> {
        match self.timed(self.repo.find_by_id(decision_id)).await {
            Ok(Some(decision)) => return Some(decision),
            Ok(None) => {}
            Err(e) => {
                error!(decision_id = %decision_id, error = %e, "Decision lookup failed");
            }
        }
        self.fallback.get(decision_id).await
    }

    /// Decide and fetch in one step.
    pub async fn judge(
        &self,
        content_type: ContentType,
        title: &str,
        body: &str,
        source_url: &str,
    ) -> (DecisionId, Option<Decision>) {
        let decision_id = self.decide(content_type, title, body, source_url).await;
        let decision = self.lookup(&decision_id).await;
        (decision_id, decision)
    }

    pub async fn stats(&self) -> Result<DecisionCounts, StoreError> {
        self.timed(self.repo.counts()).await
    }

    /// Decisions waiting in memory for a successful insert.
    pub async fn pending_persistence(&self) -> usize {
        self.fallback.len().await
    }
}
