// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use async_graphql_value::ConstValue;
use indexmap::IndexMap;
use serde::de::Error;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ValNumber {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl ValNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            ValNumber::I64(n) => *n as f64,
            ValNumber::U64(n) => *n as f64,
            ValNumber::F64(n) => *n,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValNumber::I64(n) => Some(*n),
            ValNumber::U64(n) => i64::try_from(*n).ok(),
            ValNumber::F64(_) => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, ValNumber::F64(_))
    }
}

impl Display for ValNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValNumber::I64(n) => write!(f, "{n}"),
            ValNumber::U64(n) => write!(f, "{n}"),
            ValNumber::F64(n) => write!(f, "{n}"),
        }
    }
}

impl TryFrom<ValNumber> for serde_json::Number {
    type Error = ();

    fn try_from(value: ValNumber) -> Result<Self, Self::Error> {
        match value {
            ValNumber::I64(n) => Ok(serde_json::Number::from(n)),
            ValNumber::U64(n) => Ok(serde_json::Number::from(n)),
            ValNumber::F64(n) => serde_json::Number::from_f64(n).ok_or(()),
        }
    }
}

impl From<serde_json::Number> for ValNumber {
    fn from(value: serde_json::Number) -> Self {
        if let Some(n) = value.as_i64() {
            ValNumber::I64(n)
        } else if let Some(n) = value.as_u64() {
            ValNumber::U64(n)
        } else {
            ValNumber::F64(value.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl From<i64> for ValNumber {
    fn from(value: i64) -> Self {
        ValNumber::I64(value)
    }
}

impl From<u64> for ValNumber {
    fn from(value: u64) -> Self {
        ValNumber::U64(value)
    }
}

impl From<f64> for ValNumber {
    fn from(value: f64) -> Self {
        ValNumber::F64(value)
    }
}

/// Partial ordering to allow us to compare numbers of different representations.
impl PartialOrd for ValNumber {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (ValNumber::I64(left), ValNumber::I64(right)) => left.partial_cmp(right),
            (ValNumber::U64(left), ValNumber::U64(right)) => left.partial_cmp(right),
            (ValNumber::I64(left), ValNumber::U64(right)) => {
                (*left as i128).partial_cmp(&(*right as i128))
            }
            (ValNumber::U64(left), ValNumber::I64(right)) => {
                (*left as i128).partial_cmp(&(*right as i128))
            }
            (left, right) => left.as_f64().partial_cmp(&right.as_f64()),
        }
    }
}

/// Represent a value that can be used in:
/// - arguments
/// - JWT claims
/// - callback values for `@populatedBy` fields
///
/// Objects preserve the key order of the input, which keeps translation deterministic.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Val {
    Bool(bool),
    Number(ValNumber),
    String(String),
    List(Vec<Val>),
    Object(IndexMap<String, Val>),
    Binary(bytes::Bytes),
    Enum(String),
    Null,
}

pub const TRUE: Val = Val::Bool(true);
pub const FALSE: Val = Val::Bool(false);

impl Val {
    pub fn get(&self, key: &str) -> Option<&Val> {
        match self {
            Val::Object(o) => o.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// String content of a string or an enum value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::String(s) | Val::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Val::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Val>> {
        match self {
            Val::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The elements of a list, or a single-element slice for any other value. GraphQL input
    /// coercion accepts a single value where a list is expected.
    pub fn as_list(&self) -> &[Val] {
        match self {
            Val::List(l) => l,
            other => std::slice::from_ref(other),
        }
    }

    /// Type of the value as named in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Val::Bool(_) => "Boolean",
            Val::Number(n) if n.is_integer() => "Int",
            Val::Number(_) => "Float",
            Val::String(_) => "String",
            Val::List(_) => "List",
            Val::Object(_) => "Object",
            Val::Binary(_) => "Binary",
            Val::Enum(_) => "Enum",
            Val::Null => "null",
        }
    }
}

impl Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Bool(b) => write!(f, "{b}"),
            Val::Number(n) => write!(f, "{n}"),
            Val::String(s) => write!(f, "\"{s}\""),
            Val::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Val::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Val::Binary(_) => write!(f, "Binary"),
            Val::Enum(e) => write!(f, "{e}"),
            Val::Null => write!(f, "null"),
        }
    }
}

impl TryFrom<Val> for serde_json::Value {
    type Error = serde_json::Error;

    fn try_from(value: Val) -> Result<Self, Self::Error> {
        match value {
            Val::Null => Ok(serde_json::Value::Null),
            Val::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Val::Number(n) => {
                Ok(serde_json::Value::Number(n.try_into().map_err(|_| {
                    serde_json::Error::custom("Invalid number")
                })?))
            }
            Val::String(s) => Ok(serde_json::Value::String(s)),
            Val::List(l) => Ok(serde_json::Value::Array(
                l.into_iter()
                    .map(|v| v.try_into())
                    .collect::<Result<_, _>>()?,
            )),
            Val::Object(o) => Ok(serde_json::Value::Object(
                o.into_iter()
                    .map(|(k, v)| Ok((k, v.try_into()?)))
                    .collect::<Result<_, _>>()?,
            )),
            Val::Enum(e) => Ok(serde_json::Value::String(e)),
            Val::Binary(_) => Err(Error::custom("Binary is not supported")),
        }
    }
}

impl TryFrom<ConstValue> for Val {
    type Error = serde_json::Error;

    fn try_from(value: ConstValue) -> Result<Self, Self::Error> {
        match value {
            ConstValue::Null => Ok(Val::Null),
            ConstValue::Boolean(b) => Ok(Val::Bool(b)),
            ConstValue::Number(n) => Ok(Val::Number(n.into())),
            ConstValue::String(s) => Ok(Val::String(s)),
            ConstValue::List(l) => Ok(Val::List(
                l.into_iter()
                    .map(|v| v.try_into())
                    .collect::<Result<_, _>>()?,
            )),
            ConstValue::Object(o) => Ok(Val::Object(
                o.into_iter()
                    .map(|(k, v)| Ok((k.to_string(), v.try_into()?)))
                    .collect::<Result<_, _>>()?,
            )),
            ConstValue::Binary(b) => Ok(Val::Binary(b)),
            ConstValue::Enum(e) => Ok(Val::Enum(e.to_string())),
        }
    }
}

impl From<serde_json::Value> for Val {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Val::Null,
            serde_json::Value::Bool(b) => Val::Bool(b),
            serde_json::Value::Number(n) => Val::Number(n.into()),
            serde_json::Value::String(s) => Val::String(s),
            serde_json::Value::Array(l) => Val::List(l.into_iter().map(|v| v.into()).collect()),
            serde_json::Value::Object(o) => {
                Val::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Val {
    fn from(value: &str) -> Self {
        Val::String(value.to_string())
    }
}

impl From<i64> for Val {
    fn from(value: i64) -> Self {
        Val::Number(ValNumber::I64(value))
    }
}

impl From<f64> for Val {
    fn from(value: f64) -> Self {
        Val::Number(ValNumber::F64(value))
    }
}

impl From<bool> for Val {
    fn from(value: bool) -> Self {
        Val::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_eq() {
        let one_u64: ValNumber = ValNumber::from(1u64);
        let one_i64: ValNumber = ValNumber::from(1i64);
        let one_f64: ValNumber = ValNumber::from(1.0);

        let ones = vec![one_u64, one_i64, one_f64];

        for left in &ones {
            for right in &ones {
                assert!(left.partial_cmp(right) == Some(std::cmp::Ordering::Equal))
            }
        }
    }

    #[test]
    fn test_number_lt() {
        let mins = vec![
            ValNumber::from(i64::MIN),
            ValNumber::from(f64::MIN),
            ValNumber::from(-1i64),
        ];
        let maxs = vec![
            ValNumber::from(u64::MAX),
            ValNumber::from(i64::MAX),
            ValNumber::from(f64::MAX),
        ];

        // any min is less than any max
        for left in &mins {
            for right in &maxs {
                assert!(left.partial_cmp(right) == Some(std::cmp::Ordering::Less));
                assert!(right.partial_cmp(left) == Some(std::cmp::Ordering::Greater));
            }
        }
    }

    #[test]
    fn json_object_keeps_key_order() {
        let val: Val = serde_json::json!({"zeta": 1, "alpha": [true, null], "mid": "x"}).into();

        let keys: Vec<_> = val.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(val.get("zeta").and_then(Val::as_i64), Some(1));
        assert_eq!(val.get("alpha").unwrap().as_list().len(), 2);
        assert_eq!(val.get("mid").unwrap().as_list(), &[Val::from("x")]);
    }
}
