//! Verdict - content risk scoring for Content Trust Gate
//!
//! This crate holds the leaf of the gate: a pure, deterministic heuristic
//! that maps `(title, body, source_url)` to a [`Verdict`], plus the
//! identifiers and record types every other layer shares.
//!
//! # Key Components
//!
//! - [`HeuristicScorer`]: the fixed, versioned ruleset (first-match-wins)
//! - [`ContentFingerprint`] / [`DecisionId`]: SHA-256 content addressing
//! - [`Decision`]: the immutable record issued once per fingerprint and
//!   policy version
//! - [`DecisionView`]: the projection handed to gate adapters
//!
//! # Example
//!
//! ```
//! use verdict::{evaluate, ReasonCode, Status};
//!
//! let verdict = evaluate("Launch", "The product launched. It costs $49 and ships in 3 days.", "");
//! assert_eq!(verdict.status, Status::Pass);
//! assert_eq!(verdict.reason_code, ReasonCode::Pass);
//! assert_eq!(verdict.score, 100);
//! ```

pub mod error;
pub mod fingerprint;
pub mod scorer;
pub mod types;

// Re-export main types
pub use error::VerdictError;
pub use fingerprint::{ContentFingerprint, DecisionId, PolicyVersion, DEFAULT_POLICY_VERSION};
pub use scorer::{evaluate, HeuristicScorer, Scorer, ABSOLUTE_TERMS};
pub use types::*;
