//! Parameter values, path resolution and value coercions
//!
//! Render parameters are plain [`serde_json::Value`]s. This module provides
//! the [`resolve`] function used for every `${path}` lookup and the
//! [`ValueExt`] extension trait that gives values the textual form,
//! truthiness and numeric coercions the renderer and filters rely on.
//!
//! # Paths
//!
//! Paths are dot separated. Objects are indexed by key and arrays by a
//! numeric segment:
//!
//! ```rust,ignore
//! use block_template::value::resolve;
//! use serde_json::json;
//!
//! let params = json!({"user": {"tags": ["a", "b"]}});
//! assert_eq!(resolve("user.tags.1", &params), Some(&json!("b")));
//! assert_eq!(resolve("user.missing.deeper", &params), None);
//! ```

use serde_json::{Map, Number, Value};
use std::borrow::Cow;

/// Path segment separator
pub const PATH_SEPARATOR: char = '.';

/// Resolve a dotted path against the given parameters
///
/// Resolution short-circuits to `None` as soon as an intermediate value
/// cannot be indexed; it never fails and never modifies `params`.
pub fn resolve<'v>(path: &str, params: &'v Value) -> Option<&'v Value> {
    path.split(PATH_SEPARATOR)
        .try_fold(params, |current, segment| lookup_segment(current, segment))
}

fn lookup_segment<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(obj) => obj.get(segment),
        Value::Array(arr) => {
            let index = segment.parse::<usize>().ok()?;
            arr.get(index)
        }
        _ => None,
    }
}

/// Build a number value from a float
///
/// Non-finite results cannot be stored in a JSON number, so they are kept
/// in their textual form (`NaN`, `Infinity`, `-Infinity`).
pub fn number_value(n: f64) -> Value {
    match Number::from_f64(n) {
        Some(number) => Value::Number(number),
        None => Value::String(format_number(n)),
    }
}

/// Format a float the way it appears in rendered output
///
/// Integral values are printed without a fractional part, so `1.0` renders
/// as `1` and `-0.0` as `0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{:.0}", n);
    }
    n.to_string()
}

/// Convenience helpers on parameter values
pub trait ValueExt {
    /// Text substituted into the output for this value
    ///
    /// Strings are returned verbatim, numbers in their shortest form,
    /// booleans as `true`/`false`, null as an empty string, and arrays and
    /// objects as compact JSON.
    fn to_text(&self) -> Cow<'_, str>;

    /// Whether the value counts as false in a tag-driven conditional
    ///
    /// Null, `false`, zero, the empty string, an empty array and an empty
    /// object are falsy.
    fn is_falsy(&self) -> bool;

    /// Plain truthiness: null, `false`, zero, NaN and the empty string are
    /// false, every array and object is true
    fn is_truthy(&self) -> bool;

    /// Leading-float coercion used by the numeric filters
    ///
    /// Numbers are returned as-is and strings are parsed from their longest
    /// numeric prefix; everything else is NaN.
    fn parse_float(&self) -> f64;

    /// Whole-value numeric coercion used by `min` and `max`
    fn to_number(&self) -> f64;
}

impl ValueExt for Value {
    fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Number(n) => Cow::Owned(number_text(n)),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Null => Cow::Borrowed(""),
            Value::Array(_) | Value::Object(_) => {
                Cow::Owned(serde_json::to_string(self).unwrap_or_default())
            }
        }
    }

    fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(arr) => arr.is_empty(),
            Value::Object(obj) => obj.is_empty(),
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    fn parse_float(&self) -> f64 {
        match self {
            Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            Value::String(s) => parse_float_prefix(s),
            _ => f64::NAN,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Null => 0.0,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) => f64::NAN,
        }
    }
}

/// Truthiness of an optional value; absent is falsy
pub fn is_falsy(value: Option<&Value>) -> bool {
    value.map_or(true, ValueExt::is_falsy)
}

fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        n.to_string()
    } else {
        n.as_f64().map(format_number).unwrap_or_else(|| n.to_string())
    }
}

/// Parse the longest numeric prefix of `s` after leading whitespace
fn parse_float_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        let sign = if bytes.first() == Some(&b'-') { -1.0 } else { 1.0 };
        return sign * f64::INFINITY;
    }

    let mantissa_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    let mantissa = &s[mantissa_start..end];
    if mantissa.is_empty() || mantissa == "." {
        return f64::NAN;
    }

    // Exponent only counts when at least one digit follows it
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Build a new scope: `outer` overlaid with the keys of `scope`
///
/// Non-object scopes contribute no keys. Neither input is modified.
pub fn overlay(outer: &Value, scope: &Value) -> Map<String, Value> {
    let mut merged = match outer {
        Value::Object(obj) => obj.clone(),
        _ => Map::new(),
    };
    if let Value::Object(obj) = scope {
        for (key, value) in obj {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_simple_key() {
        let params = json!({"name": "John Doe", "age": 30});
        assert_eq!(resolve("name", &params), Some(&json!("John Doe")));
        assert_eq!(resolve("age", &params), Some(&json!(30)));
        assert_eq!(resolve("missing", &params), None);
    }

    #[test]
    fn test_resolve_nested_path() {
        let params = json!({"user": {"profile": {"name": "Jane Doe"}}});
        assert_eq!(resolve("user.profile.name", &params), Some(&json!("Jane Doe")));
        assert_eq!(resolve("user.profile.missing", &params), None);
        assert_eq!(resolve("user.profile.name.deeper", &params), None);
        assert_eq!(resolve("nope.profile", &params), None);
    }

    #[test]
    fn test_resolve_array_index() {
        let params = json!({"items": ["first", "second"]});
        assert_eq!(resolve("items.1", &params), Some(&json!("second")));
        assert_eq!(resolve("items.2", &params), None);
        assert_eq!(resolve("items.x", &params), None);
    }

    #[test]
    fn test_resolve_on_non_object_params() {
        assert_eq!(resolve("a", &Value::Null), None);
        assert_eq!(resolve("a.b", &json!("text")), None);
    }

    #[test]
    fn test_resolve_does_not_modify_params() {
        let params = json!({"a": {"b": 1}});
        let before = params.clone();
        let _ = resolve("a.b.c", &params);
        assert_eq!(params, before);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(json!("text").to_text(), "text");
        assert_eq!(json!(42).to_text(), "42");
        assert_eq!(json!(-3).to_text(), "-3");
        assert_eq!(json!(1.5).to_text(), "1.5");
        assert_eq!(json!(2.0).to_text(), "2");
        assert_eq!(json!(true).to_text(), "true");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(json!([1, "a"]).to_text(), r#"[1,"a"]"#);
        assert_eq!(json!({"k": 1}).to_text(), r#"{"k":1}"#);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_number_value_non_finite() {
        assert_eq!(number_value(f64::NAN), json!("NaN"));
        assert_eq!(number_value(3.0), json!(3.0));
    }

    #[test]
    fn test_falsiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(falsy.is_falsy(), "{:?} should be falsy", falsy);
        }
        for truthy in [json!(true), json!(1), json!(-1), json!("0"), json!([0]), json!({"a": null})] {
            assert!(!truthy.is_falsy(), "{:?} should be truthy", truthy);
        }
        assert!(is_falsy(None));
    }

    #[test]
    fn test_plain_truthiness_keeps_empty_collections() {
        for truthy in [json!(true), json!(2.5), json!("x"), json!([]), json!({})] {
            assert!(truthy.is_truthy(), "{:?} should be truthy", truthy);
        }
        for falsy in [json!(null), json!(false), json!(0), json!(-0.0), json!("")] {
            assert!(!falsy.is_truthy(), "{:?} should be falsy", falsy);
        }
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(json!(-1).parse_float(), -1.0);
        assert_eq!(json!("12px").parse_float(), 12.0);
        assert_eq!(json!("  3.5").parse_float(), 3.5);
        assert_eq!(json!("-2.5e2x").parse_float(), -250.0);
        assert_eq!(json!("7e").parse_float(), 7.0);
        assert_eq!(json!(".5").parse_float(), 0.5);
        assert_eq!(json!("-Infinity").parse_float(), f64::NEG_INFINITY);
        assert!(json!("abc").parse_float().is_nan());
        assert!(json!(".").parse_float().is_nan());
        assert!(json!(true).parse_float().is_nan());
        assert!(Value::Null.parse_float().is_nan());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(json!(" 4 ").to_number(), 4.0);
        assert_eq!(json!("").to_number(), 0.0);
        assert_eq!(json!(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(json!("4px").to_number().is_nan());
        assert!(json!([1]).to_number().is_nan());
    }

    #[test]
    fn test_overlay_iteration_keys_win() {
        let outer = json!({"a": 1, "b": 2});
        let scope = json!({"b": 3, "c": 4});
        let merged = overlay(&outer, &scope);
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 3, "c": 4}));
        assert_eq!(outer, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_overlay_ignores_non_object_scope() {
        let merged = overlay(&json!({"a": 1}), &json!("item"));
        assert_eq!(Value::Object(merged), json!({"a": 1}));
    }
}
