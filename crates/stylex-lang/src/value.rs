use std::{borrow::Cow, collections::BTreeMap, fmt};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::feature::PathSegment;
use crate::number::{self, Number};

/// A dynamically-typed value produced by evaluating an expression.
///
/// Coercions follow JavaScript rules closely enough for style authoring:
///
/// | from        | [`Value::to_number`]         | [`Value::to_string`]  | [`Value::is_truthy`] |
/// |-------------|------------------------------|-----------------------|----------------------|
/// | `Number`    | itself                       | `1`, `1.5`, `NaN`     | not `0`/`NaN`        |
/// | `String`    | trimmed decimal, `""` is `0` | itself                | not empty            |
/// | `Bool`      | `0`/`1`                      | `true`/`false`        | itself               |
/// | `Null`      | `0`                          | `null`                | `false`              |
/// | `Undefined` | `NaN`                        | `undefined`           | `false`              |
/// | `Array`     | `[]` is `0`, `[x]` is `x`    | elements joined by `,`| `true`               |
/// | `Object`    | `NaN`                        | `[object Object]`     | `true`               |
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Number(Number),
    String(String),
    Bool(bool),
    Null,
    #[default]
    Undefined,
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub const NAN: Value = Value::Number(number::NAN);

    pub fn name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    #[inline(always)]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline(always)]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => !(n.is_zero() || n.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null | Value::Undefined => false,
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn to_number(&self) -> Number {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Bool(b) => Number::from(*b as i64),
            Value::Null => Number::default(),
            Value::Undefined | Value::Object(_) => number::NAN,
            Value::Array(values) => match values.as_slice() {
                [] => Number::default(),
                [value] => value.to_number(),
                _ => number::NAN,
            },
        }
    }

    /// Returns the string form without allocating when the value already is a string.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    /// Looks up a child value without copying it.
    pub fn get(&self, segment: &PathSegment) -> Option<&Value> {
        match (self, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key.as_str()),
            (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string()),
            (Value::Array(values), PathSegment::Index(index)) => values.get(*index),
            (Value::Array(values), PathSegment::Key(key)) => {
                key.parse::<usize>().ok().and_then(|index| values.get(index))
            }
            _ => None,
        }
    }

    /// Member access with the derived members (`length`, string indexing) included.
    pub fn member(&self, segment: &PathSegment) -> Value {
        if let Some(value) = self.get(segment) {
            return value.clone();
        }

        match (self, segment) {
            (Value::Array(values), PathSegment::Key(key)) if key == "length" => values.len().into(),
            (Value::String(s), PathSegment::Key(key)) if key == "length" => s.chars().count().into(),
            (Value::String(s), PathSegment::Index(index)) => s
                .chars()
                .nth(*index)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Loose (`==`) equality.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
            (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => false,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.loose_eq(b))
            }
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(_) | Value::Object(_), Value::String(s))
            | (Value::String(s), Value::Array(_) | Value::Object(_)) => {
                let other = if matches!(self, Value::String(_)) { other } else { self };
                other.to_string() == *s
            }
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            _ => self.to_number() == other.to_number(),
        }
    }
}

fn parse_number(s: &str) -> Number {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Number::default();
    }

    match trimmed {
        "Infinity" | "+Infinity" => number::INFINITE,
        "-Infinity" => -number::INFINITE,
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
            number::NAN
        }
        _ => trimmed.parse::<f64>().map(Number::new).unwrap_or(number::NAN),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
            Value::Array(values) => write!(
                f,
                "{}",
                values
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                    .join(",")
            ),
            Value::Object(_) => write!(f, "[object Object]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(i64::from(n).into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::from)
                .unwrap_or(Value::NAN),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(values) => {
                Value::Array(values.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Undefined => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) if n.is_int() && n.abs().value() < 9_007_199_254_740_992.0 => {
                serde_json::Value::from(n.as_i64())
            }
            Value::Number(n) => serde_json::Number::from_f64(n.value())
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(values) => {
                serde_json::Value::Array(values.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}
