//! Safety verdicts for store listings
//!
//! A verdict is the bounded result of asking a language model whether an app
//! listing looks like a scam, phishing attempt or infringement. The model is an
//! untrusted peer, so this crate only ever salvages: a reply is reduced to a
//! `Verdict` whose fields always satisfy their invariants, or to a
//! `ParseFailure` carrying the raw text for diagnosis.
//!
//! - `parse_verdict()`: raw reply text to `Verdict`
//! - `normalize()`: storage bounds applied before a verdict is persisted
//! - `VerdictState`: pending / scored / unavailable, as seen by the UI

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod extract;
pub mod normalize;
pub mod parse;
pub mod state;

pub use normalize::{NormalizeLimits, normalize};
pub use parse::{ParseFailure, parse_verdict};
pub use state::{SafetyBadge, VerdictState};

use serde::{Deserialize, Serialize};

/// Lowest score a verdict can carry.
pub const SCORE_MIN: u8 = 0;

/// Highest score a verdict can carry (100 = perfectly safe).
pub const SCORE_MAX: u8 = 100;

/// Score used when the model omits the score or sends something non-numeric.
pub const NEUTRAL_SCORE: u8 = 50;

/// Summary used when the model omits the summary or sends an empty one.
pub const FALLBACK_SUMMARY: &str = "Analysis completed.";

/// A bounded safety assessment attached to one package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Always within `SCORE_MIN..=SCORE_MAX`.
    pub score: u8,
    /// Never empty.
    pub summary: String,
    /// Red flags reported by the model, in reply order.
    pub flags: Vec<String>,
}

impl Verdict {
    /// Build a verdict, clamping the score into range and replacing a blank
    /// summary with `FALLBACK_SUMMARY`.
    pub fn new(score: i64, summary: impl Into<String>, flags: Vec<String>) -> Self {
        let summary = summary.into();
        let summary = if summary.trim().is_empty() {
            FALLBACK_SUMMARY.to_string()
        } else {
            summary
        };
        Self {
            score: score.clamp(i64::from(SCORE_MIN), i64::from(SCORE_MAX)) as u8,
            summary,
            flags,
        }
    }
}

/// Clamp a model-provided number into the score range.
///
/// Fractions round half away from zero. NaN maps to `NEUTRAL_SCORE`.
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return NEUTRAL_SCORE;
    }
    value
        .round()
        .clamp(f64::from(SCORE_MIN), f64::from(SCORE_MAX)) as u8
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
