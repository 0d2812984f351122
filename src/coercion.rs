//! Type Coercion Runtime
//!
//! Cross-type `+` and `==` with the semantics generated template code
//! expects: addition degrades to string concatenation on the first type
//! mismatch, and loose equality coerces toward numbers first, then strings.

use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

use crate::content::{number_to_string, Stringable};

/// A dynamically typed template value.
///
/// `Object` is opaque: it prints as its stored rendering and only ever
/// equals itself (the same allocation).
#[derive(Debug, Clone)]
pub enum CoercionValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(Arc<str>),
}

impl CoercionValue {
    pub fn object(rendering: impl Into<Arc<str>>) -> Self {
        CoercionValue::Object(rendering.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CoercionValue::Null)
    }

    fn is_number(&self) -> bool {
        matches!(self, CoercionValue::Int(_) | CoercionValue::Float(_))
    }

    /// Booleans take part in arithmetic as 0 and 1.
    fn as_arith(&self) -> Option<Number> {
        match *self {
            CoercionValue::Bool(b) => Some(Number::Int(i64::from(b))),
            CoercionValue::Int(i) => Some(Number::Int(i)),
            CoercionValue::Float(f) => Some(Number::Float(f)),
            _ => None,
        }
    }

    /// Numeric reading used by loose equality.
    fn to_number(&self) -> Option<f64> {
        match self {
            CoercionValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CoercionValue::Int(i) => Some(*i as f64),
            CoercionValue::Float(f) => Some(*f),
            CoercionValue::Str(s) => parse_float(s),
            CoercionValue::Null | CoercionValue::Object(_) => None,
        }
    }
}

impl PartialEq for CoercionValue {
    /// Strict equality: same variant and same value; objects by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CoercionValue::Null, CoercionValue::Null) => true,
            (CoercionValue::Bool(a), CoercionValue::Bool(b)) => a == b,
            (CoercionValue::Int(a), CoercionValue::Int(b)) => a == b,
            (CoercionValue::Float(a), CoercionValue::Float(b)) => a == b,
            (CoercionValue::Str(a), CoercionValue::Str(b)) => a == b,
            (CoercionValue::Object(a), CoercionValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Stringable for CoercionValue {
    fn to_display_string(&self) -> Cow<'_, str> {
        match self {
            CoercionValue::Null => Cow::Borrowed("null"),
            CoercionValue::Bool(b) => b.to_display_string(),
            CoercionValue::Int(i) => Cow::Owned(i.to_string()),
            CoercionValue::Float(f) => Cow::Owned(number_to_string(*f)),
            CoercionValue::Str(s) => Cow::Borrowed(s.as_str()),
            CoercionValue::Object(rendering) => Cow::Borrowed(&**rendering),
        }
    }
}

impl From<bool> for CoercionValue {
    fn from(value: bool) -> Self {
        CoercionValue::Bool(value)
    }
}

impl From<i64> for CoercionValue {
    fn from(value: i64) -> Self {
        CoercionValue::Int(value)
    }
}

impl From<i32> for CoercionValue {
    fn from(value: i32) -> Self {
        CoercionValue::Int(i64::from(value))
    }
}

impl From<f64> for CoercionValue {
    fn from(value: f64) -> Self {
        CoercionValue::Float(value)
    }
}

impl From<&str> for CoercionValue {
    fn from(value: &str) -> Self {
        CoercionValue::Str(value.to_string())
    }
}

impl From<String> for CoercionValue {
    fn from(value: String) -> Self {
        CoercionValue::Str(value)
    }
}

impl<T: Into<CoercionValue>> From<Option<T>> for CoercionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CoercionValue::Null, Into::into)
    }
}

impl From<&Value> for CoercionValue {
    /// Arrays and maps become opaque objects holding their compact JSON.
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => CoercionValue::Null,
            Value::Bool(b) => CoercionValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CoercionValue::Int(i),
                None => CoercionValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => CoercionValue::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => CoercionValue::object(value.to_string()),
        }
    }
}

impl From<Value> for CoercionValue {
    fn from(value: Value) -> Self {
        CoercionValue::from(&value)
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a
                .checked_add(b)
                .map_or_else(|| Number::Float(a as f64 + b as f64), Number::Int),
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        }
    }

    fn into_value(self) -> CoercionValue {
        match self {
            Number::Int(i) => CoercionValue::Int(i),
            Number::Float(f) => CoercionValue::Float(f),
        }
    }
}

/// Left fold of `+` over `values`.
///
/// Numbers and booleans add numerically. The first operand that does not
/// switches the fold to concatenation for good. `null` next to a number
/// counts as `false`, but `null` as the running total of a non-null operand
/// concatenates as `"null"`.
pub fn add(values: &[CoercionValue]) -> CoercionValue {
    let Some((first, rest)) = values.split_first() else {
        return CoercionValue::Null;
    };

    let mut total = first.clone();
    for operand in rest {
        total = add_pair(total, operand);
    }
    total
}

fn add_pair(total: CoercionValue, operand: &CoercionValue) -> CoercionValue {
    if let CoercionValue::Str(mut text) = total {
        text.push_str(&operand.to_display_string());
        return CoercionValue::Str(text);
    }

    let left = match total {
        CoercionValue::Null if operand.is_null() => Some(Number::Int(0)),
        ref other => other.as_arith(),
    };
    let right = match operand {
        CoercionValue::Null if left.is_some() => Some(Number::Int(0)),
        other => other.as_arith(),
    };

    match (left, right) {
        (Some(a), Some(b)) => a.add(b).into_value(),
        _ => {
            let mut text = total.to_display_string().into_owned();
            text.push_str(&operand.to_display_string());
            CoercionValue::Str(text)
        }
    }
}

/// Loose equality.
///
/// Against a string, booleans compare as `True`/`False`, unlike the
/// lowercase form [`add`] concatenates.
pub fn equals(a: &CoercionValue, b: &CoercionValue) -> bool {
    use CoercionValue::*;

    match (a, b) {
        (Null, _) | (_, Null) => a.is_null() && b.is_null(),
        (Bool(_), Bool(_))
        | (Int(_), Int(_))
        | (Float(_), Float(_))
        | (Str(_), Str(_))
        | (Object(_), Object(_)) => a == b,
        (Int(x), Float(y)) | (Float(y), Int(x)) => (*x as f64) == *y,
        _ if a.is_number() || b.is_number() => match (a.to_number(), b.to_number()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Str(s), other) | (other, Str(s)) => match other {
            Bool(flag) => s.as_str() == if *flag { "True" } else { "False" },
            _ => *s == other.to_display_string(),
        },
        _ => false,
    }
}

/// Position of the first element loosely equal to `item`.
pub fn list_index_of(list: &[CoercionValue], item: &CoercionValue) -> Option<usize> {
    list.iter().position(|candidate| equals(candidate, item))
}

pub fn list_contains(list: &[CoercionValue], item: &CoercionValue) -> bool {
    list_index_of(list, item).is_some()
}

/// Parses a base-10 integer, ignoring surrounding whitespace.
pub fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Parses a float, ignoring surrounding whitespace. `NaN` is not a number.
pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| !f.is_nan())
}
