//! Verdict lifecycle as seen by readers
//!
//! A version's verdict is written by a separate, possibly failing process, so
//! "no verdict yet" is a state of its own and never a default score.

use serde::Serialize;

use crate::Verdict;

/// Score above which a verdict is shown as safe
pub const SAFE_THRESHOLD: u8 = 80;

/// Score above which a verdict is shown as needing review
pub const CAUTION_THRESHOLD: u8 = 50;

/// Where a version's verdict stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VerdictState {
    /// No audit has completed yet
    Pending,
    /// An audit completed and its verdict is stored
    Scored(Verdict),
    /// The last audit attempt could not produce a verdict
    Unavailable { reason: String },
}

impl VerdictState {
    /// State for a stored, nullable verdict
    pub fn from_stored(verdict: Option<Verdict>) -> Self {
        match verdict {
            Some(v) => Self::Scored(v),
            None => Self::Pending,
        }
    }

    pub fn score(&self) -> Option<u8> {
        match self {
            Self::Scored(v) => Some(v.score),
            Self::Pending | Self::Unavailable { .. } => None,
        }
    }

    pub fn badge(&self) -> SafetyBadge {
        match self {
            Self::Scored(v) => SafetyBadge::for_score(v.score),
            Self::Pending | Self::Unavailable { .. } => SafetyBadge::Pending,
        }
    }
}

/// Badge rendered next to a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyBadge {
    Pending,
    Safe,
    Caution,
    Warning,
}

impl SafetyBadge {
    pub fn for_score(score: u8) -> Self {
        if score > SAFE_THRESHOLD {
            Self::Safe
        } else if score > CAUTION_THRESHOLD {
            Self::Caution
        } else {
            Self::Warning
        }
    }

    /// Label shown to consumers
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Analysis Pending",
            Self::Safe => "Verified Safe by AI",
            Self::Caution => "Review Recommended",
            Self::Warning => "Warning: Potential Scam",
        }
    }
}
