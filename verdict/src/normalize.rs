//! Storage bounds for verdicts
//!
//! Applied by the audit orchestrator between parsing and persisting. Idempotent:
//! normalizing a normalized verdict returns it unchanged.

use crate::{FALLBACK_SUMMARY, SCORE_MAX, Verdict, truncate_chars};

/// Size limits enforced before a verdict is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeLimits {
    /// Maximum number of flags kept (extra flags are dropped from the tail)
    pub max_flags: usize,
    /// Maximum summary length in characters
    pub max_summary_chars: usize,
    /// Maximum length of a single flag in characters
    pub max_flag_chars: usize,
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self {
            max_flags: 10,
            max_summary_chars: 1000,
            max_flag_chars: 200,
        }
    }
}

/// Clamp, trim and cap a verdict so it can be stored as-is.
pub fn normalize(verdict: Verdict, limits: &NormalizeLimits) -> Verdict {
    let score = verdict.score.min(SCORE_MAX);

    let summary = truncate_chars(verdict.summary.trim(), limits.max_summary_chars).trim_end();
    let summary = if summary.is_empty() {
        FALLBACK_SUMMARY.to_string()
    } else {
        summary.to_string()
    };

    let mut flags: Vec<String> = Vec::with_capacity(verdict.flags.len().min(limits.max_flags));
    for flag in &verdict.flags {
        if flags.len() == limits.max_flags {
            break;
        }
        let flag = truncate_chars(flag.trim(), limits.max_flag_chars).trim_end();
        if flag.is_empty() || flags.iter().any(|f| f == flag) {
            continue;
        }
        flags.push(flag.to_string());
    }

    if flags.len() < verdict.flags.len() {
        tracing::debug!(
            kept = flags.len(),
            received = verdict.flags.len(),
            "verdict flags trimmed"
        );
    }

    Verdict {
        score,
        summary,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn verdict(score: u8, summary: &str, flags: &[&str]) -> Verdict {
        Verdict {
            score,
            summary: summary.to_string(),
            flags: flags.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    #[test]
    fn test_caps_flag_count() {
        let flags: Vec<String> = (0..25).map(|i| format!("flag {i}")).collect();
        let v = Verdict {
            score: 10,
            summary: "bad".to_string(),
            flags,
        };
        let out = normalize(v, &NormalizeLimits::default());
        assert_eq!(out.flags.len(), 10);
        assert_eq!(out.flags[0], "flag 0");
        assert_eq!(out.flags[9], "flag 9");
    }

    #[test]
    fn test_trims_summary_and_flags() {
        let out = normalize(
            verdict(88, "  fine app \n", &["  a ", "", "  ", "a", "b"]),
            &NormalizeLimits::default(),
        );
        assert_eq!(out, verdict(88, "fine app", &["a", "b"]));
    }

    #[test]
    fn test_truncates_long_text() {
        let limits = NormalizeLimits {
            max_flags: 3,
            max_summary_chars: 5,
            max_flag_chars: 2,
        };
        let out = normalize(verdict(50, "abcdefgh", &["xyz"]), &limits);
        assert_eq!(out.summary, "abcde");
        assert_eq!(out.flags, vec!["xy".to_string()]);
    }

    #[test]
    fn test_blank_summary_falls_back() {
        let out = normalize(verdict(50, "   ", &[]), &NormalizeLimits::default());
        assert_eq!(out.summary, FALLBACK_SUMMARY);
    }

    #[test]
    fn test_out_of_range_score_is_capped() {
        let out = normalize(verdict(255, "x", &[]), &NormalizeLimits::default());
        assert_eq!(out.score, 100);
    }

    #[test]
    fn test_idempotent() {
        let limits = NormalizeLimits::default();
        let once = normalize(verdict(70, " ok ", &["a", "a", " b "]), &limits);
        let twice = normalize(once.clone(), &limits);
        assert_eq!(once, twice);
    }
}
