// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;

/// A value bound to a statement parameter.
///
/// Integers are 64-bit on the database side. JSON (and the drivers speaking to JavaScript clients)
/// cannot carry that range, so integers serialize in the driver's native pair form
/// `{"low": <i32>, "high": <i32>}`.
#[derive(Debug, Clone, PartialEq)]
pub enum CypherValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<CypherValue>),
    Map(IndexMap<String, CypherValue>),
}

#[derive(Debug, Error)]
pub enum CypherValueError {
    #[error("Integer {0} is out of the 64-bit range")]
    IntegerOutOfRange(String),
}

impl CypherValue {
    /// Split an integer into its low and high 32-bit halves.
    pub fn integer_parts(value: i64) -> (i32, i32) {
        (value as i32, (value >> 32) as i32)
    }

    /// Reassemble an integer from its halves (inverse of [`CypherValue::integer_parts`]).
    pub fn integer_from_parts(low: i32, high: i32) -> i64 {
        ((high as i64) << 32) | (low as u32 as i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CypherValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CypherValue::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Serializing this type cannot fail: keys are strings and floats become null when not finite
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for CypherValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CypherValue::Null => serializer.serialize_none(),
            CypherValue::Boolean(b) => serializer.serialize_bool(*b),
            CypherValue::Integer(i) => {
                let (low, high) = CypherValue::integer_parts(*i);
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("low", &low)?;
                map.serialize_entry("high", &high)?;
                map.end()
            }
            CypherValue::Float(f) => serializer.serialize_f64(*f),
            CypherValue::String(s) => serializer.serialize_str(s),
            CypherValue::List(values) => values.serialize(serializer),
            CypherValue::Map(entries) => entries.serialize(serializer),
        }
    }
}

impl From<bool> for CypherValue {
    fn from(value: bool) -> Self {
        CypherValue::Boolean(value)
    }
}

impl From<i32> for CypherValue {
    fn from(value: i32) -> Self {
        CypherValue::Integer(value as i64)
    }
}

impl From<i64> for CypherValue {
    fn from(value: i64) -> Self {
        CypherValue::Integer(value)
    }
}

impl From<f64> for CypherValue {
    fn from(value: f64) -> Self {
        CypherValue::Float(value)
    }
}

impl From<&str> for CypherValue {
    fn from(value: &str) -> Self {
        CypherValue::String(value.to_string())
    }
}

impl From<String> for CypherValue {
    fn from(value: String) -> Self {
        CypherValue::String(value)
    }
}

impl<T: Into<CypherValue>> From<Vec<T>> for CypherValue {
    fn from(values: Vec<T>) -> Self {
        CypherValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CypherValue>> From<Option<T>> for CypherValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CypherValue::Null)
    }
}

impl TryFrom<serde_json::Value> for CypherValue {
    type Error = CypherValueError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            serde_json::Value::Null => CypherValue::Null,
            serde_json::Value::Bool(b) => CypherValue::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CypherValue::Integer(i)
                } else if n.is_u64() {
                    return Err(CypherValueError::IntegerOutOfRange(n.to_string()));
                } else {
                    CypherValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => CypherValue::String(s),
            serde_json::Value::Array(values) => CypherValue::List(
                values
                    .into_iter()
                    .map(CypherValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(entries) => CypherValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k, CypherValue::try_from(v)?)))
                    .collect::<Result<_, CypherValueError>>()?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_serialize_as_low_high_pairs() {
        assert_eq!(
            CypherValue::Integer(5).to_json(),
            serde_json::json!({"low": 5, "high": 0})
        );
        assert_eq!(
            CypherValue::Integer(-1).to_json(),
            serde_json::json!({"low": -1, "high": -1})
        );

        let big = 4_294_967_296 * 3 + 7;
        assert_eq!(
            CypherValue::Integer(big).to_json(),
            serde_json::json!({"low": 7, "high": 3})
        );
    }

    #[test]
    fn integer_parts_roundtrip_extremes() {
        for value in [i64::MIN, -4_294_967_297, -1, 0, 1, i32::MAX as i64 + 1, i64::MAX] {
            let (low, high) = CypherValue::integer_parts(value);
            assert_eq!(CypherValue::integer_from_parts(low, high), value);
        }
    }

    #[test]
    fn floats_and_strings_pass_through() {
        let value = CypherValue::List(vec![
            CypherValue::Float(2.5),
            CypherValue::from("abc"),
            CypherValue::Null,
        ]);
        assert_eq!(value.to_json(), serde_json::json!([2.5, "abc", null]));
    }

    #[test]
    fn from_json_rejects_unsigned_overflow() {
        let value = serde_json::json!(u64::MAX);
        assert!(CypherValue::try_from(value).is_err());
    }
}
