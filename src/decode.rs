//! Decoding of model output embedded in stream events.
//!
//! Model output is not guaranteed to be bare JSON, so it may arrive wrapped in
//! a ```` ```json ```` fence. Decoding never fails: unparseable input becomes a
//! sentinel carrying a `parsingError` message and the original text.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

const WRAPPER_PARSE_ERROR: &str = "Failed to parse processed JSON data from wrapper";
const BARE_PARSE_ERROR: &str = "Processed data is not in expected JSON format";

/// Result of decoding a `processedData` string.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    Parsed(Value),
    Unparsed {
        parsing_error: String,
        raw_data: String,
    },
}

impl DecodedPayload {
    /// JSON shape of the result. Failures use `{ "parsingError", "rawData" }`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Parsed(value) => value.clone(),
            Self::Unparsed {
                parsing_error,
                raw_data,
            } => json!({
                "parsingError": parsing_error,
                "rawData": raw_data,
            }),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"^```json\s*([\s\S]*?)\s*```$").expect("fence pattern is a valid regex")
    })
}

/// Decode a payload string, unwrapping a ```` ```json ```` fence if present.
pub fn decode_processed_data(data: &str) -> DecodedPayload {
    if let Some(inner) = fence_pattern()
        .captures(data)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|inner| !inner.is_empty())
    {
        return match serde_json::from_str(inner) {
            Ok(value) => DecodedPayload::Parsed(value),
            Err(e) => {
                warn!("Failed to parse JSON inside fenced block: {}", e);
                DecodedPayload::Unparsed {
                    parsing_error: WRAPPER_PARSE_ERROR.to_string(),
                    raw_data: data.to_string(),
                }
            }
        };
    }

    match serde_json::from_str(data) {
        Ok(value) => DecodedPayload::Parsed(value),
        Err(e) => {
            debug!("processedData is neither fenced nor bare JSON: {}", e);
            DecodedPayload::Unparsed {
                parsing_error: BARE_PARSE_ERROR.to_string(),
                raw_data: data.to_string(),
            }
        }
    }
}

/// Error text carried by a decoded value, if it describes a failure.
///
/// Both the decoder sentinel (`parsingError`) and model output reporting its
/// own failure (`error`) count.
pub fn data_error(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    ["parsingError", "error"]
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|v| is_set(v))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json() {
        let decoded = decode_processed_data("```json\n{\"a\":1}\n```");
        assert_eq!(decoded, DecodedPayload::Parsed(json!({"a": 1})));
    }

    #[test]
    fn test_bare_json() {
        let decoded = decode_processed_data(r#"{"invoice": {"total": 12.5}}"#);
        assert_eq!(
            decoded,
            DecodedPayload::Parsed(json!({"invoice": {"total": 12.5}}))
        );
    }

    #[test]
    fn test_not_json() {
        let decoded = decode_processed_data("not json");
        assert_eq!(
            decoded.to_value(),
            json!({
                "parsingError": "Processed data is not in expected JSON format",
                "rawData": "not json",
            })
        );
    }

    #[test]
    fn test_broken_fence_keeps_original() {
        let raw = "```json\n{\"a\":\n```";
        let decoded = decode_processed_data(raw);
        match decoded {
            DecodedPayload::Unparsed {
                parsing_error,
                raw_data,
            } => {
                assert_eq!(parsing_error, WRAPPER_PARSE_ERROR);
                assert_eq!(raw_data, raw);
            }
            other => panic!("expected sentinel, got {:?}", other),
        }
    }

    #[test]
    fn test_fence_must_wrap_whole_string() {
        // Leading prose defeats the fence pattern and the bare parse.
        let decoded = decode_processed_data("Here you go:\n```json\n{\"a\":1}\n```");
        assert!(!decoded.is_parsed());
    }

    #[test]
    fn test_data_error() {
        assert_eq!(
            data_error(&json!({"parsingError": "bad", "rawData": "x"})),
            Some("bad".to_string())
        );
        assert_eq!(
            data_error(&json!({"error": "model refused"})),
            Some("model refused".to_string())
        );
        assert_eq!(data_error(&json!({"a": 1})), None);
        assert_eq!(data_error(&json!([1, 2])), None);
    }
}
