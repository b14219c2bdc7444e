//! JSON object recovery from free-form model output
//!
//! Models are asked for bare JSON but routinely wrap it in prose or
//! ```json fences. Two strategies, in order:
//! 1. Direct parse of the trimmed reply
//! 2. Depth-aware brace matching from each `{`, first object that decodes wins
//!
//! Brace matching is string- and escape-aware, so `"summary": "uses {braces}"`
//! does not end the region early.

use serde_json::{Map, Value};
use tracing::debug;

/// Upper bound on bytes walked by brace matching across all start positions.
const MAX_SCAN_BYTES: usize = 4 * 1024 * 1024;

/// How an object was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// The whole reply was a JSON object
    DirectParse,
    /// Found by brace matching inside surrounding text
    DepthTracking,
}

/// Recover the first JSON object embedded in `content`.
pub fn extract_first_object(content: &str) -> Option<(Map<String, Value>, ExtractionMethod)> {
    let trimmed = content.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some((map, ExtractionMethod::DirectParse));
    }

    let mut scanned = 0;
    let mut offset = 0;
    while let Some(rel) = content[offset..].find('{') {
        let start = offset + rel;
        if scanned > MAX_SCAN_BYTES {
            debug!(scanned, start, "giving up on JSON object search");
            break;
        }

        let (region, walked) = balanced_region(&content[start..]);
        scanned += walked;
        if let Some(region) = region
            && let Ok(Value::Object(map)) = serde_json::from_str::<Value>(region)
        {
            debug!(start, len = region.len(), "recovered JSON object by depth tracking");
            return Some((map, ExtractionMethod::DepthTracking));
        }

        offset = start + 1;
    }

    None
}

/// Slice from the leading `{` to its matching `}`, or `None` if unbalanced,
/// together with the number of bytes walked.
fn balanced_region(content: &str) -> (Option<&str>, usize) {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in content.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                let end = i + ch.len_utf8();
                match depth.checked_sub(1) {
                    Some(0) => return (Some(&content[..end]), end),
                    Some(d) => depth = d,
                    None => return (None, end),
                }
            }
            _ => {}
        }
    }

    (None, content.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse() {
        let (map, method) = extract_first_object(r#" {"score": 90} "#).expect("object");
        assert_eq!(method, ExtractionMethod::DirectParse);
        assert_eq!(map["score"], 90);
    }

    #[test]
    fn test_markdown_fence() {
        let reply = "```json\n{\"score\": 12, \"summary\": \"scam\"}\n```";
        let (map, method) = extract_first_object(reply).expect("object");
        assert_eq!(method, ExtractionMethod::DepthTracking);
        assert_eq!(map["summary"], "scam");
    }

    #[test]
    fn test_prose_around_object() {
        let reply = "Sure! Here is my analysis:\n{\"score\": 80, \"flags\": []}\nLet me know.";
        let (map, _) = extract_first_object(reply).expect("object");
        assert_eq!(map["score"], 80);
    }

    #[test]
    fn test_braces_inside_strings() {
        let reply = r#"Result: {"summary": "claims {unlimited} RAM \"}\"", "score": 3} done"#;
        let (map, _) = extract_first_object(reply).expect("object");
        assert_eq!(map["score"], 3);
        assert_eq!(map["summary"], "claims {unlimited} RAM \"}\"");
    }

    #[test]
    fn test_skips_non_json_brace_region() {
        let reply = "template {score} then {\"score\": 41}";
        let (map, _) = extract_first_object(reply).expect("object");
        assert_eq!(map["score"], 41);
    }

    #[test]
    fn test_many_placeholder_braces_before_object() {
        let mut reply = String::from("Template placeholders:");
        for i in 0..200 {
            reply.push_str(&format!(" {{slot{i}}}"));
        }
        reply.push_str("\n{\"score\": 12, \"summary\": \"scam\"}");

        let (map, method) = extract_first_object(&reply).expect("object");
        assert_eq!(method, ExtractionMethod::DepthTracking);
        assert_eq!(map["score"], 12);
        assert_eq!(map["summary"], "scam");
    }

    #[test]
    fn test_unbalanced_prefix_does_not_hide_object() {
        let reply = format!("{} {{\"score\": 77}}", "{".repeat(100));
        let (map, _) = extract_first_object(&reply).expect("object");
        assert_eq!(map["score"], 77);
    }

    #[test]
    fn test_nested_objects() {
        let reply = "x {\"score\": 60, \"meta\": {\"a\": {\"b\": 1}}} y";
        let (map, _) = extract_first_object(reply).expect("object");
        assert_eq!(map["meta"]["a"]["b"], 1);
    }

    #[test]
    fn test_no_object() {
        assert!(extract_first_object("not json at all").is_none());
        assert!(extract_first_object("").is_none());
        assert!(extract_first_object("[1, 2, 3]").is_none());
        assert!(extract_first_object("{\"score\": 5").is_none());
        assert!(extract_first_object("}}}{").is_none());
    }
}
