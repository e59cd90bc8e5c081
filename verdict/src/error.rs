//! Error types for verdict

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerdictError {
    #[error("Unknown {kind} tag: {value}")]
    UnknownTag { kind: &'static str, value: String },

    #[error("Invalid decision id: {0}")]
    InvalidDecisionId(String),

    #[error("Invalid policy version: {0}")]
    InvalidPolicyVersion(String),
}
