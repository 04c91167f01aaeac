//! Talk-to-intent parsing
//!
//! Two passes over the talk text: an embedded-JSON extractor (high
//! confidence) and a regex phrase parser (lower confidence). Neither pass
//! matching is not an error; the result is the no-op sentinel with zero
//! confidence and the orchestrator records a `NoAction` turn.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Named parameter mapping, same shape the tool contract consumes.
pub type ParamMap = serde_json::Map<String, Value>;

const JSON_CONFIDENCE: f64 = 0.9;
const PHRASE_CONFIDENCE: f64 = 0.6;

/// A parsed intention to act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    /// Tool to invoke; `None` is the documented no-op sentinel
    pub tool_name: Option<String>,
    pub parameters: ParamMap,
    /// Parser confidence in [0, 1]
    pub confidence: f64,
}

impl ActionIntent {
    /// The no-op sentinel: nothing to do, zero confidence.
    pub fn none() -> Self {
        Self {
            tool_name: None,
            parameters: ParamMap::new(),
            confidence: 0.0,
        }
    }

    pub fn new(tool_name: &str, parameters: ParamMap, confidence: f64) -> Self {
        Self {
            tool_name: Some(tool_name.to_string()),
            parameters,
            confidence,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.tool_name.is_some()
    }
}

fn phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:use|call|run|invoke)\s+(?:the\s+)?([A-Za-z_][A-Za-z0-9_]*)").unwrap()
    })
}

fn kv_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*("[^"]*"|-?\d+(?:\.\d+)?|true|false|\w+)"#)
            .unwrap()
    })
}

/// Parse talk text into an intent. Never fails; unparseable text yields
/// [`ActionIntent::none`].
pub fn parse(text: &str) -> ActionIntent {
    if let Some(intent) = parse_json_block(text) {
        debug!(tool = intent.tool_name.as_deref(), "intent parsed from JSON block");
        return intent;
    }
    if let Some(intent) = parse_phrase(text) {
        debug!(tool = intent.tool_name.as_deref(), "intent parsed from phrase");
        return intent;
    }
    ActionIntent::none()
}

/// Scan for a balanced `{...}` block with a `tool` key.
fn parse_json_block(text: &str) -> Option<ActionIntent> {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'{' {
            continue;
        }
        let mut depth = 0usize;
        for (offset, &c) in bytes[start..].iter().enumerate() {
            match c {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &text[start..=start + offset];
                        if let Some(intent) = intent_from_json(candidate) {
                            return Some(intent);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn intent_from_json(candidate: &str) -> Option<ActionIntent> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let obj = value.as_object()?;
    let tool = obj.get("tool").and_then(Value::as_str)?;
    let parameters = obj
        .get("params")
        .or_else(|| obj.get("parameters"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    Some(ActionIntent::new(tool, parameters, JSON_CONFIDENCE))
}

/// Match phrases like `use square with x=4` and collect key=value pairs.
fn parse_phrase(text: &str) -> Option<ActionIntent> {
    let captures = phrase_re().captures(text)?;
    let tool = captures.get(1)?.as_str();
    let mut parameters = ParamMap::new();
    for kv in kv_re().captures_iter(text) {
        let key = kv[1].to_string();
        let raw = &kv[2];
        let value = if let Some(stripped) = raw.strip_prefix('"') {
            Value::String(stripped.trim_end_matches('"').to_string())
        } else if raw == "true" || raw == "false" {
            Value::Bool(raw == "true")
        } else if let Ok(n) = raw.parse::<f64>() {
            serde_json::Number::from_f64(n).map(Value::Number)?
        } else {
            Value::String(raw.to_string())
        };
        parameters.insert(key, value);
    }
    Some(ActionIntent::new(tool, parameters, PHRASE_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_block_wins_with_high_confidence() {
        let talk = r#"I think I'll compute it: {"tool": "square", "params": {"x": 4}}"#;
        let intent = parse(talk);
        assert_eq!(intent.tool_name.as_deref(), Some("square"));
        assert_eq!(intent.parameters["x"], json!(4));
        assert_eq!(intent.confidence, 0.9);
    }

    #[test]
    fn nested_params_survive_extraction() {
        let talk = r#"{"tool": "pipeline", "parameters": {"opts": {"deep": true}}}"#;
        let intent = parse(talk);
        assert_eq!(intent.tool_name.as_deref(), Some("pipeline"));
        assert_eq!(intent.parameters["opts"]["deep"], json!(true));
    }

    #[test]
    fn phrase_fallback_parses_key_values() {
        let intent = parse("Let me use square with x=4 and label=\"test run\"");
        assert_eq!(intent.tool_name.as_deref(), Some("square"));
        assert_eq!(intent.parameters["x"], json!(4.0));
        assert_eq!(intent.parameters["label"], json!("test run"));
        assert_eq!(intent.confidence, 0.6);
    }

    #[test]
    fn chatter_is_the_noop_sentinel() {
        let intent = parse("What a lovely day to think about tools.");
        assert_eq!(intent, ActionIntent::none());
        assert!(!intent.is_actionable());
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn malformed_json_falls_through_to_phrase() {
        let intent = parse(r#"{"tool": broken} but really just call multiply with a=3 b=4"#);
        assert_eq!(intent.tool_name.as_deref(), Some("multiply"));
        assert_eq!(intent.confidence, 0.6);
    }
}
