//! Decision store integration tests
//!
//! Covers:
//! - compute-or-fetch idempotence (scorer runs once per content + policy)
//! - policy version invalidation
//! - concurrent first-time decisions converging on one record
//! - persistence failures, timeouts and recovery
//! - SQLite lock contention bounded by the operation timeout
//! - SQLite durability across reopen

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use decision_store::{
    DecisionCounts, DecisionRepository, DecisionStore, DecisionStoreConfig,
    MemoryDecisionRepository, SqliteStore, StoreError,
};
use verdict::{
    ContentFingerprint, ContentType, Decision, DecisionId, HeuristicScorer, PolicyVersion,
    ReasonCode, Scorer, Status, Verdict,
};

// =============================================================================
// Helpers
// =============================================================================

/// Heuristic scorer that counts its invocations.
#[derive(Default)]
struct CountingScorer {
    calls: AtomicUsize,
}

impl CountingScorer {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Scorer for CountingScorer {
    fn evaluate(&self, title: &str, body: &str, source_url: &str) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        HeuristicScorer.evaluate(title, body, source_url)
    }
}

/// Repository whose inserts fail until `healthy` is set.
#[derive(Default)]
struct FlakyRepository {
    inner: MemoryDecisionRepository,
    healthy: AtomicBool,
}

#[async_trait]
impl DecisionRepository for FlakyRepository {
    async fn find_by_content(
        &self,
        content_hash: &ContentFingerprint,
        policy_version: &PolicyVersion,
    ) -> Result<Option<Decision>, StoreError> {
        self.inner.find_by_content(content_hash, policy_version).await
    }

    async fn find_by_id(&self, decision_id: &DecisionId) -> Result<Option<Decision>, StoreError> {
        self.inner.find_by_id(decision_id).await
    }

    async fn insert(&self, decision: &Decision) -> Result<(), StoreError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(StoreError::Database("database is locked".to_string()));
        }
        self.inner.insert(decision).await
    }

    async fn counts(&self) -> Result<DecisionCounts, StoreError> {
        self.inner.counts().await
    }
}

/// Repository that never answers in time.
struct StalledRepository;

#[async_trait]
impl DecisionRepository for StalledRepository {
    async fn find_by_content(
        &self,
        _content_hash: &ContentFingerprint,
        _policy_version: &PolicyVersion,
    ) -> Result<Option<Decision>, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn find_by_id(&self, _decision_id: &DecisionId) -> Result<Option<Decision>, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn insert(&self, _decision: &Decision) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn counts(&self) -> Result<DecisionCounts, StoreError> {
        Ok(DecisionCounts::default())
    }
}

fn store_with_counter(repo: Arc<dyn DecisionRepository>) -> (DecisionStore, Arc<CountingScorer>) {
    let scorer = Arc::new(CountingScorer::default());
    let store = DecisionStore::new(repo).with_scorer(scorer.clone());
    (store, scorer)
}

const TITLE: &str = "Launch";
const BODY: &str = "The product launched. It costs $49 and ships in 3 days.";
const URL: &str = "https://example.com/launch";

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_decide_twice_scores_once() {
    let repo = Arc::new(MemoryDecisionRepository::new());
    let (store, scorer) = store_with_counter(repo.clone());

    let first = store.decide(ContentType::Post, TITLE, BODY, URL).await;
    let second = store.decide(ContentType::Post, TITLE, BODY, URL).await;

    assert_eq!(first, second);
    assert_eq!(scorer.calls(), 1);
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn test_same_content_from_other_surface_reuses_decision() {
    let repo = Arc::new(MemoryDecisionRepository::new());
    let (store, scorer) = store_with_counter(repo.clone());

    let from_post = store.decide(ContentType::Post, TITLE, BODY, URL).await;
    let from_feed = store.decide(ContentType::Feed, TITLE, BODY, URL).await;

    assert_eq!(from_post, from_feed);
    assert_eq!(scorer.calls(), 1);

    // The first surface owns the record.
    let decision = store.lookup(&from_feed).await.unwrap();
    assert_eq!(decision.content_type, ContentType::Post);
}

#[tokio::test]
async fn test_decision_id_matches_derivation() {
    let store = DecisionStore::new(Arc::new(MemoryDecisionRepository::new()));
    let id = store.decide(ContentType::Rest, TITLE, BODY, URL).await;

    let expected = DecisionId::derive(
        &ContentFingerprint::compute(TITLE, BODY, URL),
        &PolicyVersion::default(),
    );
    assert_eq!(id, expected);
}

#[tokio::test]
async fn test_policy_change_forces_new_decision() {
    let repo = Arc::new(MemoryDecisionRepository::new());
    let scorer = Arc::new(CountingScorer::default());

    let v1 = DecisionStore::new(repo.clone()).with_scorer(scorer.clone());
    let v2 = DecisionStore::with_config(
        repo.clone(),
        DecisionStoreConfig {
            policy_version: PolicyVersion::new("2026.02").unwrap(),
            ..Default::default()
        },
    )
    .with_scorer(scorer.clone());

    let old = v1.decide(ContentType::Post, TITLE, BODY, URL).await;
    let new = v2.decide(ContentType::Post, TITLE, BODY, URL).await;

    assert_ne!(old, new);
    assert_eq!(scorer.calls(), 2);
    assert_eq!(repo.len(), 2);

    // The superseded decision stays readable.
    assert_eq!(v2.lookup(&old).await.unwrap().policy_version.as_str(), "2026.01");
    assert_eq!(v2.lookup(&new).await.unwrap().policy_version.as_str(), "2026.02");
}

// =============================================================================
// Verdicts through the store
// =============================================================================

#[tokio::test]
async fn test_stored_decisions_carry_verdicts() {
    let store = DecisionStore::new(Arc::new(MemoryDecisionRepository::new()));

    let blocked = store
        .decide(
            ContentType::Post,
            "This will 100% absolutely definitely work, 반드시 trust it",
            "Believe it.",
            URL,
        )
        .await;
    let blocked = store.lookup(&blocked).await.unwrap();
    assert_eq!(blocked.status, Status::Block);
    assert_eq!(blocked.reason_code, ReasonCode::AbsoluteOveruse);
    assert_eq!(blocked.score, 50);
    assert!(blocked.immutable);

    let held = store
        .decide(
            ContentType::Comment,
            "Comment by ann",
            "It costs 5 dollars. It costs 5 dollars. It costs 5 dollars. It costs 5 dollars.",
            URL,
        )
        .await;
    let held = store.lookup(&held).await.unwrap();
    assert_eq!(held.status, Status::Hold);
    assert_eq!(held.score, 70);

    let counts = store.stats().await.unwrap();
    assert_eq!(counts.total, 2);
    assert_eq!(counts.block, 1);
    assert_eq!(counts.hold, 1);
}

#[tokio::test]
async fn test_lookup_unknown_id_is_none() {
    let store = DecisionStore::new(Arc::new(MemoryDecisionRepository::new()));
    let stale = DecisionId::parse(&"0".repeat(64)).unwrap();
    assert!(store.lookup(&stale).await.is_none());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_decisions_converge_in_memory() {
    let repo = Arc::new(MemoryDecisionRepository::new());
    let store = Arc::new(DecisionStore::new(repo.clone()));

    let tasks = (0..16).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.decide(ContentType::Post, TITLE, BODY, URL).await })
    });
    let ids: Vec<DecisionId> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(repo.len(), 1);
    assert_eq!(store.pending_persistence().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_decisions_converge_in_sqlite() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(SqliteStore::open(dir.path()).unwrap());
    let store = Arc::new(DecisionStore::new(db.clone()));

    let tasks = (0..16).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.decide(ContentType::Automation, TITLE, BODY, URL).await })
    });
    let ids: Vec<DecisionId> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(db.counts().await.unwrap().total, 1);
}

// =============================================================================
// Persistence failures
// =============================================================================

#[tokio::test]
async fn test_insert_failure_still_returns_id_and_serves_from_memory() {
    let repo = Arc::new(FlakyRepository::default());
    let store = DecisionStore::new(repo.clone());

    let id = store.decide(ContentType::Post, "Claim", "No numbers here.", URL).await;

    assert_eq!(repo.inner.len(), 0);
    assert_eq!(store.pending_persistence().await, 1);

    let decision = store.lookup(&id).await.unwrap();
    assert_eq!(decision.status, Status::Block);
    assert_eq!(decision.reason_code, ReasonCode::EvidenceMissing);
}

#[tokio::test]
async fn test_parked_decision_is_persisted_once_storage_recovers() {
    let repo = Arc::new(FlakyRepository::default());
    let (store, scorer) = store_with_counter(repo.clone());

    let id = store.decide(ContentType::Post, TITLE, BODY, URL).await;
    let parked = store.lookup(&id).await.unwrap();

    repo.healthy.store(true, Ordering::SeqCst);
    let again = store.decide(ContentType::Post, TITLE, BODY, URL).await;

    assert_eq!(id, again);
    assert_eq!(scorer.calls(), 1);
    assert_eq!(store.pending_persistence().await, 0);

    let stored = repo.inner.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.issued_at, parked.issued_at);
}

#[tokio::test]
async fn test_timeouts_count_as_persistence_failures() {
    let store = DecisionStore::with_config(
        Arc::new(StalledRepository),
        DecisionStoreConfig {
            op_timeout: Duration::from_millis(20),
            ..Default::default()
        },
    );

    let id = store.decide(ContentType::Ad, "Sale", "Save 20 percent.", URL).await;
    assert_eq!(store.pending_persistence().await, 1);

    let decision = store.lookup(&id).await.unwrap();
    assert_eq!(decision.status, Status::Pass);
    assert!(matches!(store.stats().await, Ok(_)));
}

// =============================================================================
// SQLite durability
// =============================================================================

#[tokio::test]
async fn test_locked_sqlite_write_is_bounded_by_op_timeout() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(SqliteStore::open(dir.path()).unwrap());
    repo.set_busy_timeout(Duration::from_millis(300)).unwrap();

    // Another process holds the write lock.
    let other = rusqlite::Connection::open(SqliteStore::db_path(dir.path())).unwrap();
    other.execute_batch("BEGIN IMMEDIATE").unwrap();

    let store = DecisionStore::with_config(
        repo,
        DecisionStoreConfig {
            op_timeout: Duration::from_millis(100),
            ..Default::default()
        },
    );

    let started = Instant::now();
    let id = store.decide(ContentType::Post, TITLE, BODY, URL).await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(1), "decide took {:?}", elapsed);
    assert_eq!(store.pending_persistence().await, 1);
    assert_eq!(store.lookup(&id).await.unwrap().status, Status::Pass);

    other.execute_batch("ROLLBACK").unwrap();
}

#[tokio::test]
async fn test_sqlite_decisions_survive_reopen() {
    let dir = TempDir::new().unwrap();

    let id = {
        let store = DecisionStore::new(Arc::new(SqliteStore::open(dir.path()).unwrap()));
        store.decide(ContentType::Post, TITLE, BODY, URL).await
    };

    let repo = Arc::new(SqliteStore::open(dir.path()).unwrap());
    let (store, scorer) = store_with_counter(repo);

    let decision = store.lookup(&id).await.unwrap();
    assert_eq!(decision.status, Status::Pass);
    assert_eq!(decision.score, 100);

    assert_eq!(store.decide(ContentType::Post, TITLE, BODY, URL).await, id);
    assert_eq!(scorer.calls(), 0);
}
