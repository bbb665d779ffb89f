//! Text to value coercion.
//!
//! Every function here is total: malformed input yields the zero value of the
//! target type. Structured (JSON) decoding is the one exception and yields
//! `None` instead.

use crate::domain::model::{Value, ValueKind};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r",\s*").expect("separator pattern is valid"))
}

/// Case-insensitive `"true"`; anything else is `false`.
pub fn to_boolean(text: &str) -> bool {
    text.eq_ignore_ascii_case("true")
}

pub fn to_integer(text: &str) -> i32 {
    text.parse().unwrap_or(0)
}

pub fn to_long(text: &str) -> i64 {
    text.parse().unwrap_or(0)
}

pub fn to_short(text: &str) -> i16 {
    text.parse().unwrap_or(0)
}

pub fn to_byte(text: &str) -> i8 {
    text.parse().unwrap_or(0)
}

/// Surrounding whitespace is ignored for floating point input.
pub fn to_double(text: &str) -> f64 {
    text.trim().parse().unwrap_or(0.0)
}

/// First character, `'\0'` for empty text.
pub fn to_char(text: &str) -> char {
    text.chars().next().unwrap_or('\0')
}

pub fn to_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("JSON decode failed: {}", e);
            None
        }
    }
}

/// Splits on a comma followed by optional whitespace.
///
/// Empty text gives an empty sequence and trailing empty segments are
/// dropped, so `"a, b,"` gives `["a", "b"]`.
pub fn to_string_array(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<String> = separator().split(text).map(str::to_string).collect();
    while parts.last().is_some_and(|last| last.is_empty()) {
        parts.pop();
    }
    parts
}

pub fn to_integer_array(text: &str) -> Vec<i32> {
    to_string_array(text).iter().map(|s| to_integer(s)).collect()
}

pub fn to_double_array(text: &str) -> Vec<f64> {
    to_string_array(text).iter().map(|s| to_double(s)).collect()
}

pub fn to_long_array(text: &str) -> Vec<i64> {
    to_string_array(text).iter().map(|s| to_long(s)).collect()
}

/// Decodes a response body by the declared kind.
///
/// `Json` is only honoured when the body was served as JSON; otherwise the
/// body is returned as text, like every kind without a dedicated coercion.
/// Returns `None` only when JSON decoding fails.
pub fn coerce(text: &str, kind: ValueKind, json_media: bool) -> Option<Value> {
    let value = match kind {
        ValueKind::Json if json_media => Value::Json(to_json(text)?),
        ValueKind::Void => Value::Unit,
        ValueKind::Bool => Value::Bool(to_boolean(text)),
        ValueKind::Int => Value::Int(to_integer(text)),
        ValueKind::Double => Value::Double(to_double(text)),
        ValueKind::Long => Value::Long(to_long(text)),
        ValueKind::Short => Value::Short(to_short(text)),
        ValueKind::Byte => Value::Byte(to_byte(text)),
        ValueKind::Char => Value::Char(to_char(text)),
        ValueKind::TextArray => Value::TextArray(to_string_array(text)),
        ValueKind::IntArray => Value::IntArray(to_integer_array(text)),
        ValueKind::DoubleArray => Value::DoubleArray(to_double_array(text)),
        ValueKind::LongArray => Value::LongArray(to_long_array(text)),
        ValueKind::Json | ValueKind::Text | ValueKind::Raw => Value::Text(text.to_string()),
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_boolean_is_case_insensitive_and_total() {
        assert!(to_boolean("true"));
        assert!(to_boolean("TRUE"));
        assert!(to_boolean("tRuE"));
        assert!(!to_boolean("false"));
        assert!(!to_boolean("yes"));
        assert!(!to_boolean(" true"));
        assert!(!to_boolean(""));
    }

    #[test]
    fn test_malformed_numbers_fall_back_to_zero() {
        for input in ["", "abc", "12abc", "1.5", " 7", "--1", "0x10"] {
            assert_eq!(to_integer(input), 0, "int {:?}", input);
            assert_eq!(to_long(input), 0, "long {:?}", input);
            assert_eq!(to_short(input), 0, "short {:?}", input);
            assert_eq!(to_byte(input), 0, "byte {:?}", input);
        }
        for input in ["", "abc", "1.2.3", "e5"] {
            assert_eq!(to_double(input), 0.0, "double {:?}", input);
        }
    }

    #[test]
    fn test_out_of_range_falls_back_to_zero() {
        assert_eq!(to_byte("128"), 0);
        assert_eq!(to_byte("-128"), -128);
        assert_eq!(to_short("40000"), 0);
        assert_eq!(to_integer("2147483648"), 0);
        assert_eq!(to_long("9223372036854775807"), i64::MAX);
    }

    #[test]
    fn test_well_formed_numbers() {
        assert_eq!(to_integer("42"), 42);
        assert_eq!(to_integer("-17"), -17);
        assert_eq!(to_integer("+3"), 3);
        assert_eq!(to_double("2.5e3"), 2500.0);
        assert_eq!(to_double(" 0.25 "), 0.25);
        assert!(to_double("NaN").is_nan());
        assert_eq!(to_double("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_char_of_empty_text_is_nul() {
        assert_eq!(to_char("xyz"), 'x');
        assert_eq!(to_char("é!"), 'é');
        assert_eq!(to_char(""), '\0');
    }

    #[test]
    fn test_string_array_splits_on_comma_and_whitespace() {
        assert_eq!(to_string_array("a,b,  c"), vec!["a", "b", "c"]);
        assert_eq!(to_string_array("a,\n\tb"), vec!["a", "b"]);
        assert_eq!(to_string_array("single"), vec!["single"]);
        assert_eq!(to_string_array(" a , b"), vec![" a ", "b"]);
        assert_eq!(to_string_array("a,,b"), vec!["a", "", "b"]);
        assert_eq!(to_string_array("a, b,"), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_text_gives_empty_array() {
        assert!(to_string_array("").is_empty());
        assert!(to_integer_array("").is_empty());
        assert!(to_double_array("").is_empty());
        assert!(to_long_array("").is_empty());
    }

    #[test]
    fn test_numeric_arrays_coerce_each_segment() {
        let text = "1, 2,x,  4";
        let ints = to_integer_array(text);
        assert_eq!(ints.len(), text.split(',').count());
        assert_eq!(ints, vec![1, 2, 0, 4]);
        assert_eq!(to_long_array("10,20"), vec![10, 20]);
        assert_eq!(to_double_array("1.5, oops, 3"), vec![1.5, 0.0, 3.0]);
    }

    #[test]
    fn test_json_decode_returns_none_on_mismatch() {
        let ok: Option<Item> = to_json(r#"{"id":1,"name":"a","tags":[]}"#);
        assert!(ok.is_some());

        let malformed: Option<Item> = to_json("{not json");
        assert!(malformed.is_none());

        let wrong_shape: Option<Item> = to_json(r#"{"id":"one"}"#);
        assert!(wrong_shape.is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let items = vec![
            Item {
                id: 0,
                name: String::new(),
                tags: vec![],
            },
            Item {
                id: 42,
                name: "héllo, \"world\"".to_string(),
                tags: vec!["a".to_string(), "b, c".to_string()],
            },
        ];
        for item in items {
            let wire = Value::Json(serde_json::to_value(&item).unwrap()).to_wire();
            let text = String::from_utf8(wire).unwrap();
            let back: Option<Item> = to_json(&text);
            assert_eq!(back, Some(item));
        }
    }

    #[test]
    fn test_coerce_dispatches_on_kind() {
        assert_eq!(coerce("true", ValueKind::Bool, false), Some(Value::Bool(true)));
        assert_eq!(coerce("7", ValueKind::Short, false), Some(Value::Short(7)));
        assert_eq!(coerce("", ValueKind::Void, false), Some(Value::Unit));
        assert_eq!(
            coerce("x, y", ValueKind::TextArray, false),
            Some(Value::TextArray(vec!["x".to_string(), "y".to_string()]))
        );
        assert_eq!(
            coerce(r#"{"a":1}"#, ValueKind::Json, true),
            Some(Value::Json(serde_json::json!({"a": 1})))
        );
        // JSON kind served as plain text stays text
        assert_eq!(
            coerce(r#"{"a":1}"#, ValueKind::Json, false),
            Some(Value::Text(r#"{"a":1}"#.to_string()))
        );
        assert_eq!(coerce("{broken", ValueKind::Json, true), None);
    }
}
