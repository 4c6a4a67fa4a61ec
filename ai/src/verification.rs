//! Turning a free-form model answer into a [`ReceiptVerification`]

use imlo_ledger::{ReceiptVerification, ReceiptVerificationRequest};
use serde_json::Value;

pub const VERIFICATION_FAILED_REASON: &str =
    "AI verification failed. Please retry with a clearer receipt.";
pub const MISSING_REASON: &str = "No additional reason provided";

/// Slice from the first `{` to the last `}`; models like to wrap JSON in prose or fences.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Lenient parse: anything missing or mistyped falls back to a rejecting default.
pub fn parse_verification(
    text: &str,
    request: &ReceiptVerificationRequest,
) -> ReceiptVerification {
    let json = extract_json(text)
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .unwrap_or(Value::Null);

    if json.is_null() {
        log::warn!(
            "Verifier answer for {} had no JSON object",
            request.payment_code
        );
    }

    ReceiptVerification {
        valid: json.get("valid").and_then(Value::as_bool) == Some(true),
        amount: json.get("amount").and_then(Value::as_f64),
        currency: non_empty_str(&json, "currency").unwrap_or_else(|| request.currency.clone()),
        card_last4: non_empty_str(&json, "cardLast4")
            .unwrap_or_else(|| request.card_last4.clone()),
        confidence: json
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        reason: non_empty_str(&json, "reason").unwrap_or_else(|| MISSING_REASON.to_string()),
    }
}

fn non_empty_str(json: &Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReceiptVerificationRequest {
        ReceiptVerificationRequest {
            image_reference: "https://files/r.jpg".to_string(),
            expected_amount: 50_000,
            currency: "UZS".to_string(),
            card_last4: "3764".to_string(),
            payment_code: "PAY-A1".to_string(),
        }
    }

    #[test]
    fn test_extract_json_from_fenced_answer() {
        let text = "Here you go:\n```json\n{\"valid\": true, \"x\": {\"y\": 1}}\n```";
        assert_eq!(
            extract_json(text),
            Some("{\"valid\": true, \"x\": {\"y\": 1}}")
        );
        assert_eq!(extract_json("no braces"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_full_answer() {
        let text = r#"{"valid": true, "amount": 50000, "currency": "UZS",
            "cardLast4": "3764", "confidence": 92.5, "reason": "Matches"}"#;
        let v = parse_verification(text, &request());

        assert!(v.valid);
        assert_eq!(v.amount, Some(50_000.0));
        assert_eq!(v.confidence, 92.5);
        assert_eq!(v.reason, "Matches");
        assert!(v.is_accepted());
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let v = parse_verification("Sure! {\"valid\": \"yes\"}", &request());

        // only a JSON boolean true counts
        assert!(!v.valid);
        assert_eq!(v.amount, None);
        assert_eq!(v.currency, "UZS");
        assert_eq!(v.card_last4, "3764");
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.reason, MISSING_REASON);
    }

    #[test]
    fn test_unparseable_answer_rejects() {
        let v = parse_verification("{not json at all}", &request());
        assert!(!v.valid);
        assert_eq!(v.confidence, 0.0);
        assert!(!v.is_accepted());
    }

    #[test]
    fn test_string_confidence_is_ignored() {
        let v = parse_verification(
            r#"{"valid": true, "confidence": "95", "currency": ""}"#,
            &request(),
        );
        assert!(v.valid);
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.currency, "UZS");
        assert!(!v.is_accepted());
    }
}
