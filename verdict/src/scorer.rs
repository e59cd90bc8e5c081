//! Heuristic scorer.
//!
//! Rules are ordered and first-match-wins:
//!
//! 1. two or more absolute-claim terms (case-insensitive, title + body)
//!    → `BLOCK` / `ABSOLUTE_OVERUSE`
//! 2. no digit run in the body → `BLOCK` / `EVIDENCE_MISSING`
//! 3. sentence duplicate rate above 0.25 → `HOLD` / `DUPLICATION_HIGH`
//! 4. otherwise `PASS`
//!
//! The score is computed separately: every rule whose condition holds
//! deducts its penalty, whichever rule picked the status.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::trace;

use crate::types::{ReasonCode, ResponsibilityShift, RiskLevel, Signals, Status, Verdict};

/// Absolute-claim terms, matched against lowercased text.
pub const ABSOLUTE_TERMS: [&str; 4] = ["무조건", "절대", "100%", "반드시"];

const ABSOLUTE_THRESHOLD: usize = 2;
const DUPLICATE_RATE_THRESHOLD: f64 = 0.25;

const BASE_SCORE: i32 = 100;
const ABSOLUTE_PENALTY: i32 = 40;
const EVIDENCE_PENALTY: i32 = 10;
const DUPLICATION_PENALTY: i32 = 30;

const OUTCOME_LIABILITY: &str = "Misinformation liability";
const OUTCOME_QUALITY: &str = "Content quality issue";

static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();
static SCRIPT_OR_STYLE: OnceLock<Regex> = OnceLock::new();
static MARKUP_TAG: OnceLock<Regex> = OnceLock::new();
static SENTENCE_END: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

/// Maps content to a verdict. Implementations must be pure.
pub trait Scorer: Send + Sync {
    fn evaluate(&self, title: &str, body: &str, source_url: &str) -> Verdict;
}

/// The fixed ruleset for the current policy line.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// Collect the raw signals for title and body.
    pub fn signals(&self, title: &str, body: &str) -> Signals {
        Signals {
            abs_count: absolute_count(title, body),
            num_count: digit_runs(body),
            dup_rate: duplicate_rate(body),
        }
    }
}

impl Scorer for HeuristicScorer {
    // The source URL only feeds the fingerprint; no rule reads it.
    fn evaluate(&self, title: &str, body: &str, _source_url: &str) -> Verdict {
        let signals = self.signals(title, body);

        let absolute_overuse = signals.abs_count >= ABSOLUTE_THRESHOLD;
        let evidence_missing = signals.num_count == 0;
        let duplication_high = signals.dup_rate > DUPLICATE_RATE_THRESHOLD;

        let (status, reason_code, risk_level, responsibility_shift, potential_outcome) =
            if absolute_overuse {
                (
                    Status::Block,
                    ReasonCode::AbsoluteOveruse,
                    RiskLevel::High,
                    ResponsibilityShift::SystemBlocked,
                    OUTCOME_LIABILITY,
                )
            } else if evidence_missing {
                (
                    Status::Block,
                    ReasonCode::EvidenceMissing,
                    RiskLevel::High,
                    ResponsibilityShift::SystemBlocked,
                    OUTCOME_LIABILITY,
                )
            } else if duplication_high {
                (
                    Status::Hold,
                    ReasonCode::DuplicationHigh,
                    RiskLevel::Medium,
                    ResponsibilityShift::SystemHold,
                    OUTCOME_QUALITY,
                )
            } else {
                (
                    Status::Pass,
                    ReasonCode::Pass,
                    RiskLevel::Low,
                    ResponsibilityShift::None,
                    "",
                )
            };

        let mut score = BASE_SCORE;
        if absolute_overuse {
            score -= ABSOLUTE_PENALTY;
        }
        if evidence_missing {
            score -= EVIDENCE_PENALTY;
        }
        if duplication_high {
            score -= DUPLICATION_PENALTY;
        }

        trace!(
            abs_count = signals.abs_count,
            num_count = signals.num_count,
            dup_rate = signals.dup_rate,
            status = %status,
            score,
            "Evaluated content"
        );

        Verdict {
            status,
            score,
            reason_code,
            risk_level,
            responsibility_shift,
            potential_outcome: potential_outcome.to_string(),
            signals,
        }
    }
}

/// Score content with the default ruleset.
pub fn evaluate(title: &str, body: &str, source_url: &str) -> Verdict {
    HeuristicScorer.evaluate(title, body, source_url)
}

fn absolute_count(title: &str, body: &str) -> usize {
    let lower = format!("{title} {body}").to_lowercase();
    ABSOLUTE_TERMS
        .iter()
        .map(|term| lower.matches(*term).count())
        .sum()
}

fn digit_runs(body: &str) -> usize {
    compiled(&DIGIT_RUN, r"[0-9]+").find_iter(body).count()
}

fn strip_markup(text: &str) -> String {
    let without_code = compiled(
        &SCRIPT_OR_STYLE,
        r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>",
    )
    .replace_all(text, "");
    compiled(&MARKUP_TAG, r"(?s)<[^>]*>")
        .replace_all(&without_code, "")
        .trim()
        .to_string()
}

/// Sentences end after `.`, `?` or `!` followed by whitespace. The
/// terminator stays with its sentence.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for boundary in compiled(&SENTENCE_END, r"[.?!]\s+").find_iter(text) {
        out.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    out.push(&text[start..]);

    out.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn duplicate_rate(body: &str) -> f64 {
    let plain = strip_markup(body);
    let sentences = sentences(&plain);
    if sentences.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&str> = sentences.iter().copied().collect();
    (sentences.len() - unique.len()) as f64 / sentences.len() as f64
}
