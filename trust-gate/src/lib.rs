//! Trust Gate - per-surface enforcement of content decisions
//!
//! Every surface content passes through (publishing, comments, feeds, the
//! REST API, automations, ads) asks the same [`DecisionStore`] for a
//! decision and applies its own policy to the answer.
//!
//! ```text
//!   PublishGate  CommentGate  FeedGate  RestGate  AutomationGate  AdGate
//!        \           |           |         |            |          /
//!         └──────────┴────── GateContext::check ───────┴─────────┘
//!                          │                     │
//!                   DecisionStore           AuditSink
//!                  decide + lookup       record (fire-and-forget)
//! ```
//!
//! A decision that cannot be read back is enforced as BLOCK on every
//! surface. Audit failures never change an outcome.
//!
//! [`DecisionStore`]: decision_store::DecisionStore

pub mod adapters;
pub mod config;
pub mod context;
pub mod error;
pub mod memo;
pub mod pipeline;
pub mod service;

pub use adapters::*;
pub use config::{Backend, GateConfig};
pub use context::{GateContext, Judgment};
pub use error::{GateError, BLOCKED_MESSAGE};
pub use memo::{MemoRecord, PublishMemo};
pub use pipeline::{GateInterceptor, GateItem, GatePipeline};
pub use service::{GateRuntime, TrustGate};
