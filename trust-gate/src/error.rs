//! Error types for trust-gate

use decision_store::StoreError;
use thiserror::Error;
use verdict::DecisionId;

/// Shown to whoever attempted a blocked mutation. Carries no verdict detail.
pub const BLOCKED_MESSAGE: &str = "Publishing blocked due to HIGH RISK. System intervention recorded. Responsibility shifted from publisher.";

#[derive(Error, Debug)]
pub enum GateError {
    /// The gate refused the operation.
    #[error("{message}")]
    Blocked {
        message: String,
        decision_id: DecisionId,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateError {
    pub fn blocked(decision_id: DecisionId) -> Self {
        GateError::Blocked {
            message: BLOCKED_MESSAGE.to_string(),
            decision_id,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}
