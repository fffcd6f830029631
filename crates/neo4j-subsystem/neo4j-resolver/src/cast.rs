// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::{Val, ValNumber};
use exo_cypher::{CypherValue, CypherValueError, Expression, Literal};
use neo4j_model::types::ScalarType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CastError {
    #[error("{0}")]
    Generic(String),

    #[error("Expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },

    #[error("{0}")]
    Value(#[from] CypherValueError),
}

fn mismatch(scalar: &ScalarType, value: &Val) -> CastError {
    CastError::Mismatch {
        expected: scalar.type_name().to_string(),
        actual: value.kind().to_string(),
    }
}

/// Convert a value without type guidance (claims, custom scalars, callback values)
pub fn val_to_cypher(value: &Val) -> Result<CypherValue, CastError> {
    Ok(match value {
        Val::Null => CypherValue::Null,
        Val::Bool(b) => CypherValue::Boolean(*b),
        Val::Number(number) => number_to_cypher(number)?,
        Val::String(s) | Val::Enum(s) => CypherValue::String(s.clone()),
        Val::List(elems) => CypherValue::List(
            elems
                .iter()
                .map(val_to_cypher)
                .collect::<Result<_, _>>()?,
        ),
        Val::Object(entries) => CypherValue::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), val_to_cypher(v)?)))
                .collect::<Result<_, CastError>>()?,
        ),
        Val::Binary(_) => {
            return Err(CastError::Generic(
                "Binary values are not supported".to_string(),
            ));
        }
    })
}

fn number_to_cypher(number: &ValNumber) -> Result<CypherValue, CastError> {
    if number.is_integer() {
        number
            .as_i64()
            .map(CypherValue::Integer)
            .ok_or_else(|| CypherValueError::IntegerOutOfRange(number.to_string()).into())
    } else {
        Ok(CypherValue::Float(number.as_f64()))
    }
}

/// Convert a value destined for a property (or compared with one) of the given scalar type
pub fn cast_value(value: &Val, scalar: &ScalarType) -> Result<CypherValue, CastError> {
    match (scalar, value) {
        (_, Val::Null) => Ok(CypherValue::Null),
        (ScalarType::Int | ScalarType::BigInt, Val::Number(number)) if number.is_integer() => {
            number_to_cypher(number)
        }
        // BigInt values beyond the range of JSON numbers arrive as strings
        (ScalarType::BigInt, Val::String(s)) => s
            .parse::<i64>()
            .map(CypherValue::Integer)
            .map_err(|_| CypherValueError::IntegerOutOfRange(s.clone()).into()),
        (ScalarType::Float, Val::Number(number)) => Ok(CypherValue::Float(number.as_f64())),
        (ScalarType::Boolean, Val::Bool(b)) => Ok(CypherValue::Boolean(*b)),
        (ScalarType::String | ScalarType::Id, Val::String(s)) => Ok(CypherValue::String(s.clone())),
        (ScalarType::Id, Val::Number(number)) if number.is_integer() => {
            Ok(CypherValue::String(number.to_string()))
        }
        (ScalarType::Enum(_), Val::Enum(s) | Val::String(s)) => Ok(CypherValue::String(s.clone())),
        (scalar, Val::String(s)) if scalar.is_temporal() => Ok(CypherValue::String(s.clone())),
        (ScalarType::Custom(_), value) => val_to_cypher(value),
        (scalar, value) => Err(mismatch(scalar, value)),
    }
}

/// The expression to compare with (or assign to) a property: a parameter, wrapped in the
/// constructor function for temporal types. `null` becomes a literal so that comparisons render
/// as `IS NULL`.
pub fn value_expression(
    value: &Val,
    scalar: &ScalarType,
    list: bool,
) -> Result<Expression, CastError> {
    if value.is_null() {
        return Ok(Expression::null());
    }

    if list {
        let elems = value.as_list();
        return match scalar.temporal_function() {
            Some(function) => Ok(Expression::List(
                elems
                    .iter()
                    .map(|elem| scalar_expression(elem, scalar, Some(function)))
                    .collect::<Result<_, _>>()?,
            )),
            None => Ok(Expression::param(CypherValue::List(
                elems
                    .iter()
                    .map(|elem| cast_value(elem, scalar))
                    .collect::<Result<_, _>>()?,
            ))),
        };
    }

    scalar_expression(value, scalar, scalar.temporal_function())
}

fn scalar_expression(
    value: &Val,
    scalar: &ScalarType,
    temporal_function: Option<&str>,
) -> Result<Expression, CastError> {
    let param = Expression::param(cast_value(value, scalar)?);
    Ok(match temporal_function {
        Some(function) => Expression::function(function, vec![param]),
        None => param,
    })
}

/// A `@coalesce` value written into the statement. The schema author supplied it, so it is safe
/// to inline; non-scalar values fall back to a parameter.
pub fn coalesce_expression(value: &Val) -> Result<Expression, CastError> {
    Ok(match value {
        Val::Bool(b) => Expression::Literal(Literal::Boolean(*b)),
        Val::Number(number) if number.is_integer() => match number.as_i64() {
            Some(i) => Expression::integer(i),
            None => Expression::param(number_to_cypher(number)?),
        },
        Val::Number(number) => Expression::Literal(Literal::Float(number.as_f64())),
        Val::String(s) | Val::Enum(s) => Expression::string(s.clone()),
        Val::Null => Expression::null(),
        other => Expression::param(val_to_cypher(other)?),
    })
}

#[cfg(test)]
mod tests {
    use exo_cypher::{ExpressionBuilder, assert_binding};

    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(
            cast_value(&Val::from(5), &ScalarType::Int).unwrap(),
            CypherValue::Integer(5)
        );
        assert_eq!(
            cast_value(&Val::from(5), &ScalarType::Float).unwrap(),
            CypherValue::Float(5.0)
        );
        assert_eq!(
            cast_value(&Val::from("9007199254740993"), &ScalarType::BigInt).unwrap(),
            CypherValue::Integer(9007199254740993)
        );
        assert_eq!(
            cast_value(&Val::from(12), &ScalarType::Id).unwrap(),
            CypherValue::String("12".into())
        );
        assert!(matches!(
            cast_value(&Val::from(1.5), &ScalarType::Int),
            Err(CastError::Mismatch { .. })
        ));
        assert!(matches!(
            cast_value(&Val::from(true), &ScalarType::String),
            Err(CastError::Mismatch { .. })
        ));
    }

    #[test]
    fn temporal_values_are_wrapped() {
        let expr = value_expression(
            &Val::from("2024-01-01T00:00:00Z"),
            &ScalarType::DateTime,
            false,
        )
        .unwrap();
        assert_binding!(expr.to_cypher(), "datetime($param0)", "param0" => "2024-01-01T00:00:00Z");

        let expr = value_expression(
            &Val::List(vec![Val::from("2024-01-01"), Val::from("2024-02-01")]),
            &ScalarType::Date,
            true,
        )
        .unwrap();
        assert_binding!(
            expr.to_cypher(),
            "[date($param0), date($param1)]",
            "param0" => "2024-01-01",
            "param1" => "2024-02-01"
        );
    }

    #[test]
    fn null_and_lists() {
        let expr = value_expression(&Val::Null, &ScalarType::String, false).unwrap();
        assert_eq!(expr, Expression::null());

        let expr = value_expression(
            &Val::List(vec![Val::from(1), Val::from(2)]),
            &ScalarType::Int,
            true,
        )
        .unwrap();
        assert_binding!(expr.to_cypher(), "$param0", "param0" => vec![1, 2]);
    }
}
