//! Core types for content decisions.
//!
//! Every tag stored as text in the database is a closed enum here. The
//! persisted string form is the SCREAMING_SNAKE_CASE tag
//! (`"BLOCK"`, `"EVIDENCE_MISSING"`, ...) for outcomes and lowercase for
//! content types (`"post"`, `"comment"`, ...).
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::error::VerdictError;
use crate::fingerprint::{ContentFingerprint, DecisionId, PolicyVersion};

/// Name reported by [`DecisionView`] as the owning system.
pub const SYSTEM_NAME: &str = "Content Trust Gate";

/// Enforceable outcome of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Hold,
    Block,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Hold => "HOLD",
            Self::Block => "BLOCK",
        }
    }

    /// True for any outcome that keeps content out of public view.
    pub fn is_restrictive(&self) -> bool {
        !matches!(self, Self::Pass)
    }
}

impl FromStr for Status {
    type Err = VerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(Self::Pass),
            "HOLD" => Ok(Self::Hold),
            "BLOCK" => Ok(Self::Block),
            other => Err(VerdictError::UnknownTag {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Which rule produced the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Pass,
    AbsoluteOveruse,
    EvidenceMissing,
    DuplicationHigh,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::AbsoluteOveruse => "ABSOLUTE_OVERUSE",
            Self::EvidenceMissing => "EVIDENCE_MISSING",
            Self::DuplicationHigh => "DUPLICATION_HIGH",
        }
    }
}

impl FromStr for ReasonCode {
    type Err = VerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(Self::Pass),
            "ABSOLUTE_OVERUSE" => Ok(Self::AbsoluteOveruse),
            "EVIDENCE_MISSING" => Ok(Self::EvidenceMissing),
            "DUPLICATION_HIGH" => Ok(Self::DuplicationHigh),
            other => Err(VerdictError::UnknownTag {
                kind: "reason code",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = VerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(VerdictError::UnknownTag {
                kind: "risk level",
                value: other.to_string(),
            }),
        }
    }
}

/// Records that the automated system, not a human operator, owns the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponsibilityShift {
    None,
    SystemBlocked,
    SystemHold,
}

impl ResponsibilityShift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::SystemBlocked => "SYSTEM_BLOCKED",
            Self::SystemHold => "SYSTEM_HOLD",
        }
    }
}

impl FromStr for ResponsibilityShift {
    type Err = VerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "SYSTEM_BLOCKED" => Ok(Self::SystemBlocked),
            "SYSTEM_HOLD" => Ok(Self::SystemHold),
            other => Err(VerdictError::UnknownTag {
                kind: "responsibility shift",
                value: other.to_string(),
            }),
        }
    }
}

/// Surface a piece of content was submitted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Post,
    Comment,
    Feed,
    Rest,
    Automation,
    Ad,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Feed => "feed",
            Self::Rest => "rest",
            Self::Automation => "automation",
            Self::Ad => "ad",
        }
    }

    pub fn all() -> [Self; 6] {
        [
            Self::Post,
            Self::Comment,
            Self::Feed,
            Self::Rest,
            Self::Automation,
            Self::Ad,
        ]
    }
}

impl FromStr for ContentType {
    type Err = VerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            "feed" => Ok(Self::Feed),
            "rest" => Ok(Self::Rest),
            "automation" => Ok(Self::Automation),
            "ad" => Ok(Self::Ad),
            other => Err(VerdictError::UnknownTag {
                kind: "content type",
                value: other.to_string(),
            }),
        }
    }
}

/// Gate that produced an audit entry.
///
/// One per surface, plus `PostBlock` for a publish request the filter
/// demoted to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum GateType {
    Post,
    PostBlock,
    Comment,
    Feed,
    Rest,
    Automation,
    Ad,
}

impl GateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::PostBlock => "post_block",
            Self::Comment => "comment",
            Self::Feed => "feed",
            Self::Rest => "rest",
            Self::Automation => "automation",
            Self::Ad => "ad",
        }
    }

    /// Surface the gated content was submitted through.
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Post | Self::PostBlock => ContentType::Post,
            Self::Comment => ContentType::Comment,
            Self::Feed => ContentType::Feed,
            Self::Rest => ContentType::Rest,
            Self::Automation => ContentType::Automation,
            Self::Ad => ContentType::Ad,
        }
    }
}

impl From<ContentType> for GateType {
    fn from(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Post => Self::Post,
            ContentType::Comment => Self::Comment,
            ContentType::Feed => Self::Feed,
            ContentType::Rest => Self::Rest,
            ContentType::Automation => Self::Automation,
            ContentType::Ad => Self::Ad,
        }
    }
}

impl FromStr for GateType {
    type Err = VerdictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post_block" => Ok(Self::PostBlock),
            other => other
                .parse::<ContentType>()
                .map(Self::from)
                .map_err(|_| VerdictError::UnknownTag {
                    kind: "gate type",
                    value: other.to_string(),
                }),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Status, ReasonCode, RiskLevel, ResponsibilityShift, ContentType, GateType);

/// Raw heuristic signals behind a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Signals {
    /// Absolute-claim term occurrences across title and body
    pub abs_count: usize,
    /// Digit runs in the body
    pub num_count: usize,
    /// (sentences - unique sentences) / sentences, 0 when there are none
    pub dup_rate: f64,
}

/// Output of one scorer evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Verdict {
    pub status: Status,
    /// Informational only: 100 minus every deduction that applied. Not clamped.
    pub score: i32,
    pub reason_code: ReasonCode,
    pub risk_level: RiskLevel,
    pub responsibility_shift: ResponsibilityShift,
    pub potential_outcome: String,
    pub signals: Signals,
}

/// Immutable decision record.
///
/// Issued on the first evaluation of a (fingerprint, policy version) pair
/// and never updated or deleted; a new policy version supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Decision {
    pub decision_id: DecisionId,
    pub content_type: ContentType,
    pub content_hash: ContentFingerprint,
    pub policy_version: PolicyVersion,
    pub status: Status,
    pub score: i32,
    pub reason_code: ReasonCode,
    pub risk_level: RiskLevel,
    pub responsibility_shift: ResponsibilityShift,
    pub potential_outcome: String,
    pub issued_at: DateTime<Utc>,
    pub immutable: bool,
}

impl Decision {
    /// Issue a new decision from a fresh verdict.
    pub fn issue(
        content_type: ContentType,
        content_hash: ContentFingerprint,
        policy_version: PolicyVersion,
        verdict: Verdict,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            decision_id: DecisionId::derive(&content_hash, &policy_version),
            content_type,
            content_hash,
            policy_version,
            status: verdict.status,
            score: verdict.score,
            reason_code: verdict.reason_code,
            risk_level: verdict.risk_level,
            responsibility_shift: verdict.responsibility_shift,
            potential_outcome: verdict.potential_outcome,
            issued_at,
            immutable: true,
        }
    }

    pub fn view(&self) -> DecisionView {
        DecisionView::from(self)
    }
}

/// What a gate adapter (or an external caller) sees of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct DecisionView {
    pub decision_id: DecisionId,
    pub decision: Status,
    pub reason_code: ReasonCode,
    pub risk_level: RiskLevel,
    pub responsibility_shift: ResponsibilityShift,
    pub potential_outcome: String,
    pub policy_version: PolicyVersion,
    pub system: String,
    pub immutable: bool,
}

impl From<&Decision> for DecisionView {
    fn from(decision: &Decision) -> Self {
        Self {
            decision_id: decision.decision_id.clone(),
            decision: decision.status,
            reason_code: decision.reason_code,
            risk_level: decision.risk_level,
            responsibility_shift: decision.responsibility_shift,
            potential_outcome: decision.potential_outcome.clone(),
            policy_version: decision.policy_version.clone(),
            system: SYSTEM_NAME.to_string(),
            immutable: decision.immutable,
        }
    }
}

/// One gate invocation. Append-only; many entries may share a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AuditEntry {
    /// Assigned by the log on append; `None` until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<u64>,
    pub gate_type: GateType,
    pub subject_id: String,
    pub decision_id: DecisionId,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(gate_type: GateType, subject_id: impl Into<String>, decision_id: DecisionId) -> Self {
        Self {
            entry_id: None,
            gate_type,
            subject_id: subject_id.into(),
            decision_id,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_strings() {
        for status in [Status::Pass, Status::Hold, Status::Block] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        for content_type in ContentType::all() {
            assert_eq!(content_type.to_string().parse::<ContentType>().unwrap(), content_type);
        }
        assert_eq!(
            "SYSTEM_HOLD".parse::<ResponsibilityShift>().unwrap(),
            ResponsibilityShift::SystemHold
        );
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = "MAYBE".parse::<Status>().unwrap_err();
        assert_eq!(
            err,
            VerdictError::UnknownTag {
                kind: "status",
                value: "MAYBE".to_string()
            }
        );
        assert!("Post".parse::<ContentType>().is_err());
        assert!("post-block".parse::<GateType>().is_err());
    }

    #[test]
    fn test_gate_type_tags() {
        assert_eq!("post_block".parse::<GateType>().unwrap(), GateType::PostBlock);
        assert_eq!("comment".parse::<GateType>().unwrap(), GateType::Comment);
        assert_eq!(GateType::PostBlock.to_string(), "post_block");
        assert_eq!(GateType::PostBlock.content_type(), ContentType::Post);
        for content_type in ContentType::all() {
            let gate_type = GateType::from(content_type);
            assert_eq!(gate_type.content_type(), content_type);
            assert_eq!(gate_type.as_str(), content_type.as_str());
        }
        let json = serde_json::to_string(&GateType::PostBlock).unwrap();
        assert_eq!(json, "\"post_block\"");
    }

    #[test]
    fn test_serde_uses_persisted_tags() {
        let json = serde_json::to_string(&ReasonCode::EvidenceMissing).unwrap();
        assert_eq!(json, "\"EVIDENCE_MISSING\"");
        let json = serde_json::to_string(&ContentType::Automation).unwrap();
        assert_eq!(json, "\"automation\"");
    }

    #[test]
    fn test_view_carries_system_name() {
        let hash = ContentFingerprint::compute("t", "b 1", "u");
        let verdict = crate::evaluate("t", "b 1", "u");
        let decision = Decision::issue(
            ContentType::Post,
            hash,
            PolicyVersion::default(),
            verdict,
            Utc::now(),
        );
        let view = decision.view();
        assert_eq!(view.system, SYSTEM_NAME);
        assert_eq!(view.decision, decision.status);
        assert!(view.immutable);
    }
}
