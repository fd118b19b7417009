//! Placeholder filters
//!
//! A filter is written after a pipe inside a placeholder, `${name|upper}`,
//! and is applied once to the resolved value before it is formatted and
//! escaped. The set of filters is fixed:
//!
//! | Family  | Filters                            | Input                   |
//! |---------|------------------------------------|-------------------------|
//! | string  | `upper` `lower` `capitalize` `trim` | a string               |
//! | number  | `abs` `round` `floor` `ceil`       | anything, parsed as float |
//! | array   | `first` `last` `min` `max`         | an array                |
//! | generic | `stringify`                        | anything                |

use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value::{number_value, ValueExt};

/// The fixed set of placeholder filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Upper,
    Lower,
    Capitalize,
    Trim,
    Abs,
    Round,
    Floor,
    Ceil,
    First,
    Last,
    Min,
    Max,
    Stringify,
}

impl Filter {
    /// All filters, in documentation order
    pub const ALL: [Filter; 13] = [
        Filter::Upper,
        Filter::Lower,
        Filter::Capitalize,
        Filter::Trim,
        Filter::Abs,
        Filter::Round,
        Filter::Floor,
        Filter::Ceil,
        Filter::First,
        Filter::Last,
        Filter::Min,
        Filter::Max,
        Filter::Stringify,
    ];

    /// The name used in templates
    pub fn name(self) -> &'static str {
        match self {
            Filter::Upper => "upper",
            Filter::Lower => "lower",
            Filter::Capitalize => "capitalize",
            Filter::Trim => "trim",
            Filter::Abs => "abs",
            Filter::Round => "round",
            Filter::Floor => "floor",
            Filter::Ceil => "ceil",
            Filter::First => "first",
            Filter::Last => "last",
            Filter::Min => "min",
            Filter::Max => "max",
            Filter::Stringify => "stringify",
        }
    }

    /// Apply the filter to a resolved value
    ///
    /// `None` stands for an absent value. String and array filters reject
    /// values of any other shape with [`Error::TypeError`].
    pub fn apply<'v>(self, value: Option<Cow<'v, Value>>) -> Result<Option<Cow<'v, Value>>> {
        let result = match self {
            Filter::Upper => Value::String(self.expect_str(&value)?.to_uppercase()),
            Filter::Lower => Value::String(self.expect_str(&value)?.to_lowercase()),
            Filter::Capitalize => Value::String(capitalize(self.expect_str(&value)?)),
            Filter::Trim => Value::String(self.expect_str(&value)?.trim().to_string()),
            Filter::Abs => number_value(parse_float(&value).abs()),
            Filter::Round => number_value(round_half_up(parse_float(&value))),
            Filter::Floor => number_value(parse_float(&value).floor()),
            Filter::Ceil => number_value(parse_float(&value).ceil()),
            Filter::First => {
                return Ok(self.expect_array(&value)?.first().cloned().map(Cow::Owned));
            }
            Filter::Last => {
                return Ok(self.expect_array(&value)?.last().cloned().map(Cow::Owned));
            }
            Filter::Min => number_value(
                self.expect_array(&value)?
                    .iter()
                    .map(ValueExt::to_number)
                    .fold(f64::INFINITY, min_propagating_nan),
            ),
            Filter::Max => number_value(
                self.expect_array(&value)?
                    .iter()
                    .map(ValueExt::to_number)
                    .fold(f64::NEG_INFINITY, max_propagating_nan),
            ),
            Filter::Stringify => match value {
                Some(value) => Value::String(serde_json::to_string(value.as_ref())?),
                None => return Ok(None),
            },
        };
        Ok(Some(Cow::Owned(result)))
    }

    fn expect_str<'a>(self, value: &'a Option<Cow<'_, Value>>) -> Result<&'a str> {
        match value.as_deref() {
            Some(Value::String(s)) => Ok(s),
            other => Err(Error::type_owned(format!(
                "filter \"{}\" expects a string, got {}",
                self.name(),
                describe(other)
            ))),
        }
    }

    fn expect_array<'a>(self, value: &'a Option<Cow<'_, Value>>) -> Result<&'a Vec<Value>> {
        match value.as_deref() {
            Some(Value::Array(arr)) => Ok(arr),
            other => Err(Error::type_owned(format!(
                "filter \"{}\" expects an array, got {}",
                self.name(),
                describe(other)
            ))),
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Filter::ALL
            .iter()
            .copied()
            .find(|filter| filter.name() == name)
            .ok_or_else(|| Error::unknown_filter(name))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse `name` and apply the filter in one step
pub fn apply<'v>(name: &str, value: Option<Cow<'v, Value>>) -> Result<Option<Cow<'v, Value>>> {
    name.parse::<Filter>()?.apply(value)
}

fn parse_float(value: &Option<Cow<'_, Value>>) -> f64 {
    value.as_deref().map_or(f64::NAN, ValueExt::parse_float)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Round to the nearest integer, halves toward positive infinity
fn round_half_up(n: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    let floor = n.floor();
    if n - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn min_propagating_nan(acc: f64, n: f64) -> f64 {
    if acc.is_nan() || n.is_nan() {
        f64::NAN
    } else {
        acc.min(n)
    }
}

fn max_propagating_nan(acc: f64, n: f64) -> f64 {
    if acc.is_nan() || n.is_nan() {
        f64::NAN
    } else {
        acc.max(n)
    }
}

fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None => "an absent value",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}
