//! Reply-to-verdict parsing
//!
//! Maximum salvage: once a JSON object is recovered, each field is validated
//! on its own and a bad field degrades to its default instead of discarding
//! the verdict. The only hard failure is a reply with no recoverable object.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::extract::extract_first_object;
use crate::{FALLBACK_SUMMARY, NEUTRAL_SCORE, Verdict, clamp_score};

/// Why a reply could not be turned into a verdict
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("model reply contained no JSON object ({} bytes)", raw.len())]
    MalformedReply {
        /// The reply exactly as received
        raw: String,
    },
}

impl ParseFailure {
    /// Raw reply text, for operator diagnosis
    pub fn raw(&self) -> &str {
        match self {
            Self::MalformedReply { raw } => raw,
        }
    }
}

/// Parse a raw model reply into a verdict.
///
/// `score` is clamped into range (missing or non-numeric becomes
/// `NEUTRAL_SCORE`), `summary` falls back to `FALLBACK_SUMMARY`, and
/// non-string `flags` entries are dropped.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ParseFailure> {
    let Some((obj, method)) = extract_first_object(raw) else {
        return Err(ParseFailure::MalformedReply {
            raw: raw.to_string(),
        });
    };

    let verdict = Verdict {
        score: score_field(&obj),
        summary: summary_field(&obj),
        flags: flags_field(&obj),
    };

    tracing::debug!(
        method = ?method,
        score = verdict.score,
        flags = verdict.flags.len(),
        "parsed verdict from model reply"
    );

    Ok(verdict)
}

fn score_field(obj: &Map<String, Value>) -> u8 {
    match obj.get("score") {
        Some(Value::Number(n)) => n.as_f64().map_or(NEUTRAL_SCORE, clamp_score),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) => clamp_score(v),
            Err(_) => {
                tracing::debug!(score = %s, "non-numeric score string, using neutral score");
                NEUTRAL_SCORE
            }
        },
        Some(other) => {
            tracing::debug!(score = %other, "score has unexpected type, using neutral score");
            NEUTRAL_SCORE
        }
        None => NEUTRAL_SCORE,
    }
}

fn summary_field(obj: &Map<String, Value>) -> String {
    match obj.get("summary") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => FALLBACK_SUMMARY.to_string(),
    }
}

fn flags_field(obj: &Map<String, Value>) -> Vec<String> {
    match obj.get("flags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
