//! Pull an embedded JSON value out of free-form model output.
//!
//! Strategies, in order:
//! 1. a ```` ```json ```` fenced block
//! 2. the first bare `{...}` / `[...]` value in the text
//! 3. (flat maps only) a scan for `"key": "value"` pairs

use crate::error::FormatError;
#[cfg(feature = "python")]
use pyo3::prelude::*;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// What the caller expects to get back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Any JSON object or array.
    Any,
    Object,
    Array,
    /// An object of string values; enables the key/value scan fallback.
    FlatMap,
}

/// Which strategy produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Fenced,
    Bare,
    KeyValueScan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    pub strategy: Strategy,
}

static PAIR_REGEX: OnceLock<Regex> = OnceLock::new();

fn pair_regex() -> &'static Regex {
    PAIR_REGEX.get_or_init(|| {
        Regex::new(r#""((?:[^"\\]|\\.)*)"\s*:\s*"((?:[^"\\]|\\.)*)""#)
            .expect("Invalid key/value pair regex")
    })
}

/// Extract a JSON value of the given shape from `raw`.
pub fn extract_structured(raw: &str, shape: Shape) -> Result<Value, FormatError> {
    extract_with_strategy(raw, shape).map(|extracted| extracted.value)
}

/// Like [`extract_structured`], also reporting which strategy matched.
pub fn extract_with_strategy(raw: &str, shape: Shape) -> Result<Extracted, FormatError> {
    let mut reason = None;

    if let Some(block) = fenced_block(raw) {
        match parse_shaped(&block, shape) {
            Ok(value) => {
                debug!(strategy = "fenced", "extracted structured value");
                return Ok(Extracted {
                    value,
                    strategy: Strategy::Fenced,
                });
            }
            Err(e) => {
                warn!(error = %e, "fenced block did not parse, trying bare value");
                reason = Some(format!("fenced block: {}", e));
            }
        }
    }

    match bare_value(raw, shape) {
        Ok(value) => {
            debug!(strategy = "bare", "extracted structured value");
            return Ok(Extracted {
                value,
                strategy: Strategy::Bare,
            });
        }
        Err(e) => {
            reason.get_or_insert(e);
        }
    }

    if shape == Shape::FlatMap {
        let pairs = scan_pairs(raw);
        if !pairs.is_empty() {
            warn!(pairs = pairs.len(), "recovered flat map by key/value scan");
            return Ok(Extracted {
                value: Value::Object(pairs),
                strategy: Strategy::KeyValueScan,
            });
        }
    }

    Err(FormatError::new(
        reason.unwrap_or_else(|| "no JSON found in response".to_string()),
        raw,
    ))
}

/// Contents between a line reading ```` ```json ```` and the next line reading ```` ``` ````.
fn fenced_block(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.lines().collect();
    let open = lines
        .iter()
        .position(|l| l.trim().eq_ignore_ascii_case("```json"))?;
    let close = lines[open + 1..]
        .iter()
        .position(|l| l.trim() == "```")?
        + open
        + 1;
    Some(lines[open + 1..close].join("\n"))
}

fn parse_shaped(text: &str, shape: Shape) -> Result<Value, String> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|e| e.to_string())?;
    check_shape(value, shape)
}

fn check_shape(value: Value, shape: Shape) -> Result<Value, String> {
    let ok = match shape {
        Shape::Any => value.is_object() || value.is_array(),
        Shape::Object | Shape::FlatMap => value.is_object(),
        Shape::Array => value.is_array(),
    };
    if ok {
        Ok(value)
    } else {
        Err(format!("expected {}, found {}", shape_name(shape), kind(&value)))
    }
}

fn bare_value(raw: &str, shape: Shape) -> Result<Value, String> {
    let (open, close) = match shape {
        Shape::Object | Shape::FlatMap => ('{', '}'),
        Shape::Array => ('[', ']'),
        Shape::Any => match (raw.find('{'), raw.find('[')) {
            (Some(o), Some(a)) if a < o => ('[', ']'),
            (None, Some(_)) => ('[', ']'),
            _ => ('{', '}'),
        },
    };

    let first = raw
        .find(open)
        .ok_or_else(|| format!("no '{}' found in response", open))?;

    // First complete top-level value starting at any opener; trailing prose is ignored.
    for (start, _) in raw.match_indices(open) {
        let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if let Ok(value) = check_shape(value, shape) {
                return Ok(value);
            }
        }
    }

    // Last resort: first opener through last closer.
    let last = raw
        .rfind(close)
        .filter(|&end| end > first)
        .ok_or_else(|| format!("no closing '{}' found in response", close))?;
    parse_shaped(&raw[first..=last], shape)
}

fn scan_pairs(raw: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for caps in pair_regex().captures_iter(raw) {
        let key = unescape(&caps[1]);
        if key.trim().is_empty() {
            continue;
        }
        map.insert(key, Value::String(unescape(&caps[2])));
    }
    map
}

fn unescape(s: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", s)).unwrap_or_else(|_| s.to_string())
}

fn shape_name(shape: Shape) -> &'static str {
    match shape {
        Shape::Any => "an object or array",
        Shape::Object | Shape::FlatMap => "an object",
        Shape::Array => "an array",
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============= Python Bindings =============

/// Extracted value as JSON text. `shape` is one of any, object, array, flat_map.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "extract_structured", signature = (text, shape = "any"))]
pub fn py_extract_structured(text: &str, shape: &str) -> PyResult<String> {
    let shape = match shape {
        "any" => Shape::Any,
        "object" => Shape::Object,
        "array" => Shape::Array,
        "flat_map" => Shape::FlatMap,
        other => {
            return Err(pyo3::exceptions::PyValueError::new_err(format!("unknown shape '{}'", other)))
        }
    };
    let value = extract_structured(text, shape)
        .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))?;
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_block_is_preferred() {
        let raw = "```json\n{\"a\":\"1\"}\n```";
        let extracted = extract_with_strategy(raw, Shape::Any).unwrap();
        assert_eq!(extracted.value, json!({"a": "1"}));
        assert_eq!(extracted.strategy, Strategy::Fenced);
    }

    #[test]
    fn fenced_block_with_surrounding_prose() {
        let raw = "Sure! Here are your questions:\n\n```json\n[\n  {\"question\": \"2+2?\"}\n]\n```\nGood luck!";
        let value = extract_structured(raw, Shape::Array).unwrap();
        assert_eq!(value, json!([{"question": "2+2?"}]));
    }

    #[test]
    fn bare_object_in_prose() {
        let raw = "The result is {\"Concept\": \"Neural Networks\", \"response\": [\"Layers\"]} as requested.";
        let extracted = extract_with_strategy(raw, Shape::Object).unwrap();
        assert_eq!(extracted.strategy, Strategy::Bare);
        assert_eq!(extracted.value["Concept"], "Neural Networks");
    }

    #[test]
    fn bare_array_takes_first_parseable_array() {
        let raw = "See section [1] for details.\n[{\"q\": 1}, {\"q\": 2}]";
        let value = extract_structured(raw, Shape::Array).unwrap();
        assert_eq!(value, json!([1]));

        let value = extract_structured("See [note] then [{\"q\": 1}]", Shape::Array).unwrap();
        assert_eq!(value, json!([{"q": 1}]));
    }

    #[test]
    fn broken_fence_falls_back_to_bare_value() {
        let raw = "```json\n{oops}\n```\n{\"ok\": true}";
        let extracted = extract_with_strategy(raw, Shape::Object).unwrap();
        assert_eq!(extracted.strategy, Strategy::Bare);
        assert_eq!(extracted.value, json!({"ok": true}));
    }

    #[test]
    fn flat_map_recovers_from_truncated_output() {
        let raw = "```json\n{\n  \"Osmosis\": \"Movement of water\",\n  \"Diffusion\": \"Spread of \\\"particles\\\"\",\n  \"Mitosis\": \"Cell div";
        let extracted = extract_with_strategy(raw, Shape::FlatMap).unwrap();
        assert_eq!(extracted.strategy, Strategy::KeyValueScan);
        let map = extracted.value.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["Osmosis"], "Movement of water");
        assert_eq!(map["Diffusion"], "Spread of \"particles\"");
    }

    #[test]
    fn no_structure_is_a_format_error() {
        let raw = "I could not find any content in the provided file.";
        let err = extract_structured(raw, Shape::Any).unwrap_err();
        assert_eq!(err.raw(), raw);
        assert!(extract_structured(raw, Shape::FlatMap).is_err());
    }

    #[test]
    fn shape_mismatch_is_a_format_error() {
        let err = extract_structured("```json\n{\"a\": 1}\n```", Shape::Array).unwrap_err();
        assert!(err.reason().contains("expected an array"));
    }

    #[test]
    fn empty_object_is_legitimately_empty() {
        let value = extract_structured("{}", Shape::FlatMap).unwrap();
        assert_eq!(value, json!({}));
    }
}
