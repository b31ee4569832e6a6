//! JSON parsing helpers for AI backend responses
//!
//! Models often wrap the JSON payload in prose or code fences, so the outermost
//! `{ ... }` is extracted before deserializing.

use crate::error::{Error, Result};

use super::types::{ExternalSubscription, SubscriptionResponse};

const RAW_PREVIEW_CHARS: usize = 200;

fn preview(s: &str) -> String {
    if s.chars().count() > RAW_PREVIEW_CHARS {
        let head: String = s.chars().take(RAW_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// Slice from the first `{` to the last `}`
pub fn extract_json_object(response: &str) -> Option<&str> {
    let response = response.trim();
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

/// Parse `{"subscriptions": [...]}` out of a model response.
///
/// Every entry must carry `merchant`, `amount`, `frequency` ("monthly" or
/// "yearly") and `confidence` in [0, 1]. Any deviation fails the whole response.
pub fn parse_subscription_response(response: &str) -> Result<Vec<ExternalSubscription>> {
    let json_str = extract_json_object(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in AI response | Raw: {}",
            preview(response.trim())
        ))
    })?;

    let parsed: SubscriptionResponse = serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid subscription JSON from AI: {} | Raw: {}",
            e,
            preview(json_str)
        ))
    })?;

    for sub in &parsed.subscriptions {
        sub.validate()?;
    }

    Ok(parsed.subscriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;

    #[test]
    fn test_parse_plain_json() {
        let response = r#"{"subscriptions": [
            {"merchant": "NETFLIX.COM", "amount": 15.99, "frequency": "monthly", "confidence": 0.95},
            {"merchant": "Amazon Prime", "amount": 139.0, "frequency": "yearly", "confidence": 0.8}
        ]}"#;

        let subs = parse_subscription_response(response).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].merchant, "NETFLIX.COM");
        assert_eq!(subs[1].frequency, Frequency::Yearly);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let response = "Sure! Here is what I found:\n```json\n{\"subscriptions\": [{\"merchant\": \"SPOTIFY\", \"amount\": 10.99, \"frequency\": \"monthly\", \"confidence\": 0.9}]}\n```\nLet me know.";
        let subs = parse_subscription_response(response).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].merchant, "SPOTIFY");
    }

    #[test]
    fn test_parse_empty_list() {
        let subs = parse_subscription_response(r#"{"subscriptions": []}"#).unwrap();
        assert!(subs.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_list() {
        assert!(parse_subscription_response(r#"{"results": []}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_frequency() {
        let response = r#"{"subscriptions": [{"merchant": "GYM", "amount": 40, "frequency": "weekly", "confidence": 0.9}]}"#;
        assert!(parse_subscription_response(response).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let response = r#"{"subscriptions": [{"merchant": "GYM", "frequency": "monthly", "confidence": 0.9}]}"#;
        assert!(parse_subscription_response(response).is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_confidence() {
        let response = r#"{"subscriptions": [{"merchant": "GYM", "amount": 40, "frequency": "monthly", "confidence": 95}]}"#;
        assert!(parse_subscription_response(response).is_err());
    }

    #[test]
    fn test_parse_no_json() {
        let err = parse_subscription_response("I could not find any subscriptions.").unwrap_err();
        assert!(err.to_string().contains("No JSON found"));
    }

    #[test]
    fn test_parse_truncated_json() {
        assert!(parse_subscription_response(r#"{"subscriptions": [{"merchant": "X"}"#).is_err());
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("abc {\"a\": 1} def"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_object("} nothing {"), None);
        assert_eq!(extract_json_object(""), None);
    }
}
