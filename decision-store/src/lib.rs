//! Decision Store - content-addressed decision cache and audit log
//!
//! Guarantees at most one decision per (content fingerprint, policy version)
//! and serves it to every caller afterwards.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────┐
//! │        DecisionStore         │      │   BufferedAuditSink      │
//! │  decide() / lookup()         │      │   record() (no result)   │
//! └──────────────┬───────────────┘      └────────────┬─────────────┘
//!                │                                   │ mpsc
//!                ▼                                   ▼
//! ┌──────────────────────────────┐      ┌──────────────────────────┐
//! │  DecisionRepository          │      │  AuditRepository         │
//! │  (SqliteStore / Memory)      │      │  (SqliteStore / AuditLog)│
//! └──────────────────────────────┘      └──────────────────────────┘
//! ```
//!
//! The only concurrency primitive is the unique key on `decision_id`.
//! Scoring is pure, so two racing evaluations produce the same record and
//! the loser simply reads back the winner.

pub mod audit;
pub mod db;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

pub use audit::{AuditSink, AuditWriter, BufferedAuditSink, DEFAULT_AUDIT_BUFFER};
pub use db::SqliteStore;
pub use error::StoreError;
pub use memory::{AuditLog, MemoryDecisionRepository};
pub use repository::{AuditRepository, DecisionCounts, DecisionRepository};
pub use store::{DecisionStore, DecisionStoreConfig};
