//! Content addressing for decisions.
//!
//! A decision is identified by `sha256(fingerprint | policy_version)`, so any
//! caller that sees the same bytes under the same policy arrives at the same
//! id without shared state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::error::VerdictError;

/// Policy version active when no other is configured.
pub const DEFAULT_POLICY_VERSION: &str = "2026.01";

/// Longest policy version tag the decision table accepts.
const MAX_POLICY_VERSION_LEN: usize = 32;

/// Hex length of a SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

fn sha256_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Digest of `title ‖ body ‖ source_url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn compute(title: &str, body: &str, source_url: &str) -> Self {
        Self(sha256_hex(&[title, body, source_url]))
    }

    /// Wrap a fingerprint read back from storage.
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque ruleset tag, e.g. `2026.01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct PolicyVersion(String);

impl PolicyVersion {
    pub fn new(version: impl Into<String>) -> Result<Self, VerdictError> {
        let version = version.into();
        let trimmed = version.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_POLICY_VERSION_LEN || trimmed != version {
            return Err(VerdictError::InvalidPolicyVersion(version));
        }
        Ok(Self(version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PolicyVersion {
    fn default() -> Self {
        Self(DEFAULT_POLICY_VERSION.to_string())
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-length decision identifier (64 lowercase hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct DecisionId(String);

impl DecisionId {
    pub fn derive(fingerprint: &ContentFingerprint, policy_version: &PolicyVersion) -> Self {
        Self(sha256_hex(&[fingerprint.as_str(), "|", policy_version.as_str()]))
    }

    /// Parse an id supplied by a caller. Only the shape is checked; the id
    /// may still be unknown to the store.
    pub fn parse(raw: &str) -> Result<Self, VerdictError> {
        let raw = raw.trim();
        if raw.len() != DIGEST_HEX_LEN || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VerdictError::InvalidDecisionId(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = ContentFingerprint::compute("Title", "Body 1.", "https://example.com/a");
        let b = ContentFingerprint::compute("Title", "Body 1.", "https://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), DIGEST_HEX_LEN);
    }

    #[test]
    fn test_fingerprint_changes_on_any_byte() {
        let base = ContentFingerprint::compute("Title", "Body 1.", "https://example.com/a");
        assert_ne!(base, ContentFingerprint::compute("Title", "Body 2.", "https://example.com/a"));
        assert_ne!(base, ContentFingerprint::compute("title", "Body 1.", "https://example.com/a"));
        assert_ne!(base, ContentFingerprint::compute("Title", "Body 1.", "https://example.com/b"));
    }

    #[test]
    fn test_decision_id_is_deterministic_per_policy() {
        let hash = ContentFingerprint::compute("t", "b", "u");
        let v1 = PolicyVersion::default();
        let v2 = PolicyVersion::new("2026.02").unwrap();

        assert_eq!(DecisionId::derive(&hash, &v1), DecisionId::derive(&hash, &v1));
        assert_ne!(DecisionId::derive(&hash, &v1), DecisionId::derive(&hash, &v2));
    }

    #[test]
    fn test_decision_id_parse() {
        let hash = ContentFingerprint::compute("t", "b", "u");
        let id = DecisionId::derive(&hash, &PolicyVersion::default());

        assert_eq!(DecisionId::parse(id.as_str()).unwrap(), id);
        assert_eq!(DecisionId::parse(&id.as_str().to_uppercase()).unwrap(), id);
        assert!(DecisionId::parse("not-an-id").is_err());
        assert!(DecisionId::parse(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_policy_version_validation() {
        assert_eq!(PolicyVersion::default().as_str(), DEFAULT_POLICY_VERSION);
        assert!(PolicyVersion::new("").is_err());
        assert!(PolicyVersion::new(" 2026.01").is_err());
        assert!(PolicyVersion::new("x".repeat(33)).is_err());
    }
}
