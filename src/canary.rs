//! Canary honeytoken detection over argument payloads.
//!
//! The flattener visits scalars directly and recursively concatenates
//! mapping values and sequence elements with single spaces; the detector
//! lowercases the blob and matches each canary three ways: direct substring,
//! base64-encoded form, and a structured-partial form that catches
//! underscore-split obfuscation.

use base64::Engine;
use serde_json::Value;

/// Flatten any JSON payload into a space-separated searchable string.
///
/// Mapping keys are not visited; only values carry payload.
pub fn flatten(payload: &Value) -> String {
    match payload {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flatten).collect::<Vec<_>>().join(" "),
        Value::Object(map) => map.values().map(flatten).collect::<Vec<_>>().join(" "),
    }
}

/// Detect canary tokens in a payload.
///
/// Matches, per canary:
/// 1. the lowercased token as a substring of the flattened blob;
/// 2. the base64 encoding of the token, lowercased, as a substring;
/// 3. when the token splits on `_` into at least two parts of length >= 4,
///    all such parts present in any order.
///
/// The two-part minimum on rule 3 avoids false positives on reason codes
/// like `canary_detected`.
pub fn detect_canary(payload: &Value, canaries: &[String]) -> bool {
    let blob = flatten(payload).to_lowercase();
    if blob.is_empty() {
        return false;
    }

    for canary in canaries {
        let lowered = canary.to_lowercase();
        if blob.contains(&lowered) {
            return true;
        }

        let encoded = base64::engine::general_purpose::STANDARD
            .encode(canary.as_bytes())
            .to_lowercase();
        if blob.contains(&encoded) {
            return true;
        }

        let parts: Vec<&str> = lowered.split('_').filter(|p| p.len() >= 4).collect();
        if parts.len() >= 2 && parts.iter().all(|p| blob.contains(p)) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canaries() -> Vec<String> {
        vec!["CANARY_KEY_001".to_owned(), "CANARY_KEY_002".to_owned()]
    }

    #[test]
    fn test_flatten_nested_payload() {
        let payload = json!({
            "project": "SEC",
            "nested": {"title": "T", "tags": ["a", "b"]},
            "count": 3,
        });
        let blob = flatten(&payload);
        for needle in ["SEC", "T", "a b", "3"] {
            assert!(blob.contains(needle), "missing {needle} in {blob}");
        }
    }

    #[test]
    fn test_direct_match_case_insensitive() {
        let payload = json!({"body": "leaking canary_key_001 here"});
        assert!(detect_canary(&payload, &canaries()));
    }

    #[test]
    fn test_base64_encoded_match() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("CANARY_KEY_001");
        let payload = json!({"body": format!("blob {encoded} blob")});
        assert!(detect_canary(&payload, &canaries()));
    }

    #[test]
    fn test_structured_partial_match() {
        // Parts reordered and separated: "canary" and "key_001"-ish pieces.
        let payload = json!({"body": "split canary over 0017 key_0 canary"});
        // Both parts of length >= 4 ("canary", "key"): "key" is too short,
        // so only "canary" qualifies and this must NOT match.
        assert!(!detect_canary(&payload, &canaries()));

        let payload = json!({"body": "first CANARY then elsewhere KEY_001 no wait 001"});
        // Parts >= 4 chars for CANARY_KEY_001 are only "canary", so a single
        // qualifying part never matches on rule 3 alone.
        assert!(!detect_canary(&payload, &canaries()));
    }

    #[test]
    fn test_structured_partial_needs_two_long_parts() {
        let canaries = vec!["SECRET_TOKEN_ALPHA".to_owned()];
        let payload = json!({"body": "alpha was seen near the secret token store"});
        assert!(detect_canary(&payload, &canaries));
    }

    #[test]
    fn test_reason_codes_do_not_false_positive() {
        let payload = json!({"reason": "canary_detected"});
        assert!(!detect_canary(&payload, &canaries()));
    }

    #[test]
    fn test_empty_payload() {
        assert!(!detect_canary(&Value::Null, &canaries()));
        assert!(!detect_canary(&json!({}), &canaries()));
    }
}
