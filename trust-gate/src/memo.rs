//! Short-lived memory of publish results, keyed by post id.
//!
//! The publish filter remembers the last non-PASS decision for a post so a
//! later status transition can demote it without deciding again. Every
//! [`PURGE_EVERY`]th write sweeps out expired entries, so posts that are
//! never saved again do not accumulate.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use verdict::{DecisionId, Status};

/// Default lifetime of a memo entry.
pub const DEFAULT_MEMO_TTL: Duration = Duration::from_secs(3600);

/// Writes between sweeps of expired entries.
pub const PURGE_EVERY: usize = 64;

/// A remembered publish result.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoRecord {
    pub decision_id: DecisionId,
    /// `None` when the decision could not be read back
    pub status: Option<Status>,
}

struct MemoEntry {
    record: MemoRecord,
    expires_at: Instant,
}

pub struct PublishMemo {
    entries: DashMap<u64, MemoEntry>,
    ttl: Duration,
    writes: AtomicUsize,
}

impl Default for PublishMemo {
    fn default() -> Self {
        Self::new(DEFAULT_MEMO_TTL)
    }
}

impl PublishMemo {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn remember(&self, post_id: u64, record: MemoRecord) {
        self.entries.insert(
            post_id,
            MemoEntry {
                record,
                expires_at: Instant::now() + self.ttl,
            },
        );
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_EVERY == 0 {
            self.purge_expired();
        }
    }

    /// Live record for a post, if any. Expired entries are dropped on read.
    pub fn recall(&self, post_id: u64) -> Option<MemoRecord> {
        let now = Instant::now();
        let expired = match self.entries.get(&post_id) {
            Some(entry) if entry.expires_at > now => return Some(entry.record.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(&post_id, |_, entry| entry.expires_at <= now);
        }
        None
    }

    pub fn forget(&self, post_id: u64) {
        self.entries.remove(&post_id);
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdict::{ContentFingerprint, PolicyVersion};

    fn record(status: Option<Status>) -> MemoRecord {
        MemoRecord {
            decision_id: DecisionId::derive(
                &ContentFingerprint::compute("t", "b", "u"),
                &PolicyVersion::default(),
            ),
            status,
        }
    }

    #[test]
    fn test_remember_and_recall() {
        let memo = PublishMemo::default();
        memo.remember(42, record(Some(Status::Hold)));

        assert_eq!(memo.recall(42), Some(record(Some(Status::Hold))));
        assert!(memo.recall(7).is_none());

        memo.forget(42);
        assert!(memo.recall(42).is_none());
        assert!(memo.is_empty());
    }

    #[test]
    fn test_expired_entries_are_not_recalled() {
        let memo = PublishMemo::new(Duration::ZERO);
        memo.remember(1, record(Some(Status::Block)));
        memo.remember(2, record(None));

        assert!(memo.recall(1).is_none());
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.purge_expired(), 1);
        assert!(memo.is_empty());
    }

    #[test]
    fn test_writes_sweep_expired_entries() {
        let memo = PublishMemo::new(Duration::ZERO);
        for post_id in 0..1000 {
            memo.remember(post_id, record(Some(Status::Hold)));
        }
        assert!(memo.len() < PURGE_EVERY, "memo kept {} entries", memo.len());

        let live = PublishMemo::default();
        for post_id in 0..(PURGE_EVERY as u64 * 2) {
            live.remember(post_id, record(Some(Status::Hold)));
        }
        assert_eq!(live.len(), PURGE_EVERY * 2);
    }
}
