// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Parse `where` input objects into [`FilterExpression`]s.
//!
//! Keys are resolved against the filtered type: a bare field name is an equality (or, for a
//! relationship, an existence test), and everything else is a field name followed by an operator
//! suffix. Suffixes are tried longest first, so `title_NOT_IN` resolves to `title` with `_NOT_IN`.

use indexmap::IndexMap;
use thiserror::Error;

use common::value::Val;

use crate::{
    access::AuthPredicate,
    filter::{
        AggregateFunction, AggregateSide, AggregateWhere, ComparisonOp, ConnectionBranch,
        ConnectionWhere, FilterExpression, FilterValue, NumericOp, PropertyComparison,
        PropertyTarget, Quantifier, RelationshipBranch,
    },
    relationship::{RelationshipDescriptor, RelationshipId},
    schema::Neo4jSchema,
    types::{FieldDescriptor, PropertyField, ScalarType, TypeId, TypeKind},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterParseError {
    #[error("Expected an object for '{0}'")]
    ExpectedObject(String),

    #[error("Expected a list for '{0}'")]
    ExpectedList(String),

    #[error("Unknown filter field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("Filter '{key}' is not supported for field '{field}' of type '{type_name}'")]
    UnsupportedOperator {
        type_name: String,
        field: String,
        key: String,
    },

    #[error("Invalid value for '{key}': expected {expected}, got {actual}")]
    InvalidValue {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("Aggregation filters are not available for '{0}'")]
    AggregationUnavailable(String),

    #[error("Relationship '{0}' has no properties to filter on")]
    NoRelationshipProperties(String),

    #[error("Unknown member type '{member}' for '{field}'")]
    UnknownMemberType { field: String, member: String },
}

/// Operator suffixes for property comparisons: (suffix, operator, negated)
const PROPERTY_OPERATORS: [(&str, ComparisonOp, bool); 17] = [
    ("_NOT_STARTS_WITH", ComparisonOp::StartsWith, true),
    ("_NOT_ENDS_WITH", ComparisonOp::EndsWith, true),
    ("_NOT_CONTAINS", ComparisonOp::Contains, true),
    ("_NOT_INCLUDES", ComparisonOp::Includes, true),
    ("_STARTS_WITH", ComparisonOp::StartsWith, false),
    ("_ENDS_WITH", ComparisonOp::EndsWith, false),
    ("_CONTAINS", ComparisonOp::Contains, false),
    ("_INCLUDES", ComparisonOp::Includes, false),
    ("_MATCHES", ComparisonOp::Matches, false),
    ("_NOT_IN", ComparisonOp::In, true),
    ("_LTE", ComparisonOp::Lte, false),
    ("_GTE", ComparisonOp::Gte, false),
    ("_NOT", ComparisonOp::Eq, true),
    ("_LT", ComparisonOp::Lt, false),
    ("_GT", ComparisonOp::Gt, false),
    ("_IN", ComparisonOp::In, false),
    ("_EQ", ComparisonOp::Eq, false),
];

/// Relationship suffixes: (suffix, quantifier, quantifier when the value is `null`)
const RELATIONSHIP_QUANTIFIERS: [(&str, Quantifier, Option<Quantifier>); 5] = [
    ("_SINGLE", Quantifier::Single, None),
    ("_SOME", Quantifier::Some, None),
    ("_NONE", Quantifier::None, None),
    ("_ALL", Quantifier::All, None),
    ("_NOT", Quantifier::None, Some(Quantifier::Some)),
];

const CONNECTION_SUFFIXES: [(&str, Quantifier, Option<Quantifier>); 6] = [
    ("Connection_SINGLE", Quantifier::Single, None),
    ("Connection_SOME", Quantifier::Some, None),
    ("Connection_NONE", Quantifier::None, None),
    ("Connection_ALL", Quantifier::All, None),
    ("Connection_NOT", Quantifier::None, Some(Quantifier::Some)),
    ("Connection", Quantifier::Some, Some(Quantifier::None)),
];

const COUNT_OPERATORS: [(&str, NumericOp); 6] = [
    ("count", NumericOp::Equal),
    ("count_EQ", NumericOp::Equal),
    ("count_LT", NumericOp::Lt),
    ("count_LTE", NumericOp::Lte),
    ("count_GT", NumericOp::Gt),
    ("count_GTE", NumericOp::Gte),
];

const NUMERIC_OPERATORS: [(&str, NumericOp); 5] = [
    ("_EQUAL", NumericOp::Equal),
    ("_LTE", NumericOp::Lte),
    ("_GTE", NumericOp::Gte),
    ("_LT", NumericOp::Lt),
    ("_GT", NumericOp::Gt),
];

const AGGREGATE_FUNCTIONS: [(&str, AggregateFunction); 7] = [
    ("_SHORTEST_LENGTH", AggregateFunction::ShortestLength),
    ("_LONGEST_LENGTH", AggregateFunction::LongestLength),
    ("_AVERAGE_LENGTH", AggregateFunction::AverageLength),
    ("_AVERAGE", AggregateFunction::Average),
    ("_MIN", AggregateFunction::Min),
    ("_MAX", AggregateFunction::Max),
    ("_SUM", AggregateFunction::Sum),
];

const JWT_PREFIX: &str = "$jwt.";

pub struct FilterParser<'a> {
    schema: &'a Neo4jSchema,
    /// Accept `"$jwt.<path>"` values (authorization rules only)
    allow_jwt_references: bool,
}

impl<'a> FilterParser<'a> {
    pub fn new(schema: &'a Neo4jSchema) -> Self {
        Self {
            schema,
            allow_jwt_references: false,
        }
    }

    pub fn with_jwt_references(schema: &'a Neo4jSchema) -> Self {
        Self {
            schema,
            allow_jwt_references: true,
        }
    }

    /// Parse a `where` argument for the given type
    pub fn parse(&self, type_id: TypeId, value: &Val) -> Result<FilterExpression, FilterParseError> {
        let type_name = &self.schema.types[type_id].name;
        let object = expect_object(type_name, value)?;

        let expressions = object
            .iter()
            .map(|(key, value)| match key.as_str() {
                "AND" => Ok(FilterExpression::And(
                    self.parse_list(key, value, |v| self.parse(type_id, v))?,
                )),
                "OR" => Ok(FilterExpression::Or(
                    self.parse_list(key, value, |v| self.parse(type_id, v))?,
                )),
                "NOT" => Ok(FilterExpression::Not(Box::new(self.parse(type_id, value)?))),
                _ => self.parse_key(type_id, key, value),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FilterExpression::all(expressions))
    }

    /// Parse the `where` of an authorization rule: `{ node: {...}, jwt: {...}, AND, OR, NOT }`
    pub fn parse_auth_where(
        &self,
        type_id: TypeId,
        value: &Val,
    ) -> Result<AuthPredicate, FilterParseError> {
        let object = expect_object("where", value)?;

        let predicates = object
            .iter()
            .map(|(key, value)| match key.as_str() {
                "node" => Ok(AuthPredicate::Node(self.parse(type_id, value)?)),
                "jwt" => Ok(AuthPredicate::Jwt(self.parse_jwt(value)?)),
                "AND" => Ok(AuthPredicate::And(
                    self.parse_list(key, value, |v| self.parse_auth_where(type_id, v))?,
                )),
                "OR" => Ok(AuthPredicate::Or(
                    self.parse_list(key, value, |v| self.parse_auth_where(type_id, v))?,
                )),
                "NOT" => Ok(AuthPredicate::Not(Box::new(
                    self.parse_auth_where(type_id, value)?,
                ))),
                _ => Err(FilterParseError::UnknownField {
                    type_name: "AuthorizationWhere".to_string(),
                    field: key.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if predicates.len() == 1 {
            predicates.into_iter().next().unwrap_or(AuthPredicate::And(vec![]))
        } else {
            AuthPredicate::And(predicates)
        })
    }

    /// Parse a filter over JWT claims. Declared claims (`@jwt`) are checked; without a declaration
    /// any claim name is accepted.
    pub fn parse_jwt(&self, value: &Val) -> Result<FilterExpression, FilterParseError> {
        let object = expect_object("jwt", value)?;

        let expressions = object
            .iter()
            .map(|(key, value)| match key.as_str() {
                "AND" => Ok(FilterExpression::And(
                    self.parse_list(key, value, |v| self.parse_jwt(v))?,
                )),
                "OR" => Ok(FilterExpression::Or(
                    self.parse_list(key, value, |v| self.parse_jwt(v))?,
                )),
                "NOT" => Ok(FilterExpression::Not(Box::new(self.parse_jwt(value)?))),
                _ => self.parse_jwt_key(key, value),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FilterExpression::all(expressions))
    }

    fn parse_jwt_key(&self, key: &str, value: &Val) -> Result<FilterExpression, FilterParseError> {
        let claim_target = |name: &str, op: ComparisonOp| -> Option<PropertyTarget> {
            match &self.schema.jwt {
                Some(_) => self.schema.jwt_claim(name).map(|claim| PropertyTarget {
                    field_name: claim.name.clone(),
                    db_name: claim.path.clone(),
                    scalar: claim.scalar.clone(),
                    list: claim.list,
                    coalesce: None,
                }),
                None => Some(PropertyTarget {
                    field_name: name.to_string(),
                    db_name: name.to_string(),
                    scalar: ScalarType::Custom("JWT".to_string()),
                    list: op == ComparisonOp::Includes,
                    coalesce: None,
                }),
            }
        };

        if self.schema.jwt.is_some() {
            if let Some(target) = claim_target(key, ComparisonOp::Eq) {
                return self.comparison("JWT", target, key, ComparisonOp::Eq, false, value);
            }
        }
        for (suffix, op, negated) in PROPERTY_OPERATORS {
            if let Some(name) = key.strip_suffix(suffix) {
                if name.is_empty() {
                    continue;
                }
                if let Some(target) = claim_target(name, op) {
                    return self.comparison("JWT", target, key, op, negated, value);
                }
            }
        }
        match claim_target(key, ComparisonOp::Eq) {
            Some(target) if self.schema.jwt.is_none() => {
                self.comparison("JWT", target, key, ComparisonOp::Eq, false, value)
            }
            _ => Err(FilterParseError::UnknownField {
                type_name: "JWT".to_string(),
                field: key.to_string(),
            }),
        }
    }

    fn parse_key(
        &self,
        type_id: TypeId,
        key: &str,
        value: &Val,
    ) -> Result<FilterExpression, FilterParseError> {
        let typ = &self.schema.types[type_id];

        if let Some(field) = typ.field(key) {
            return match field.relationship() {
                Some(relationship) => self.parse_relationship(
                    relationship,
                    Quantifier::Some,
                    Some(Quantifier::None),
                    key,
                    value,
                ),
                None => self.parse_property(type_id, field, key, ComparisonOp::Eq, false, value),
            };
        }

        if let Some(field_name) = key.strip_suffix("Aggregate") {
            if let Some((relationship, _)) = self.schema.relationship_of(type_id, field_name) {
                return self.parse_aggregate(relationship, key, value);
            }
        }

        for (suffix, quantifier, null_quantifier) in CONNECTION_SUFFIXES {
            if let Some(field_name) = key.strip_suffix(suffix) {
                if let Some((relationship, _)) = self.schema.relationship_of(type_id, field_name) {
                    return self.parse_connection(
                        relationship,
                        quantifier,
                        null_quantifier,
                        key,
                        value,
                    );
                }
            }
        }

        for (suffix, quantifier, null_quantifier) in RELATIONSHIP_QUANTIFIERS {
            if let Some(field_name) = key.strip_suffix(suffix) {
                if let Some((relationship, _)) = self.schema.relationship_of(type_id, field_name) {
                    return self.parse_relationship(
                        relationship,
                        quantifier,
                        null_quantifier,
                        key,
                        value,
                    );
                }
            }
        }

        for (suffix, op, negated) in PROPERTY_OPERATORS {
            if let Some(field_name) = key.strip_suffix(suffix) {
                if let Some(field) = typ.field(field_name) {
                    return self.parse_property(type_id, field, key, op, negated, value);
                }
            }
        }

        Err(FilterParseError::UnknownField {
            type_name: typ.name.clone(),
            field: key.to_string(),
        })
    }

    fn parse_property(
        &self,
        type_id: TypeId,
        field: &FieldDescriptor,
        key: &str,
        op: ComparisonOp,
        negated: bool,
        value: &Val,
    ) -> Result<FilterExpression, FilterParseError> {
        let type_name = &self.schema.types[type_id].name;
        let property = field
            .property()
            .ok_or_else(|| FilterParseError::UnsupportedOperator {
                type_name: type_name.clone(),
                field: field.name.clone(),
                key: key.to_string(),
            })?;

        self.comparison(
            type_name,
            property_target(field, property),
            key,
            op,
            negated,
            value,
        )
    }

    fn comparison(
        &self,
        type_name: &str,
        target: PropertyTarget,
        key: &str,
        op: ComparisonOp,
        negated: bool,
        value: &Val,
    ) -> Result<FilterExpression, FilterParseError> {
        if !operator_applies(&target, op) {
            return Err(FilterParseError::UnsupportedOperator {
                type_name: type_name.to_string(),
                field: target.field_name.clone(),
                key: key.to_string(),
            });
        }

        let value = self.filter_value(&target, op, key, value)?;
        let comparison = FilterExpression::Comparison(PropertyComparison {
            property: target,
            op,
            value,
        });

        Ok(if negated {
            FilterExpression::Not(Box::new(comparison))
        } else {
            comparison
        })
    }

    fn filter_value(
        &self,
        target: &PropertyTarget,
        op: ComparisonOp,
        key: &str,
        value: &Val,
    ) -> Result<FilterValue, FilterParseError> {
        if self.allow_jwt_references {
            if let Val::String(s) = value {
                if let Some(path) = s.strip_prefix(JWT_PREFIX) {
                    return Ok(FilterValue::JwtClaim(path.to_string()));
                }
            }
        }

        match (op, value) {
            (ComparisonOp::Eq, Val::Null) => {}
            (ComparisonOp::Eq, Val::List(elems)) if target.list => {
                for elem in elems {
                    check_scalar(&target.scalar, key, elem, true)?;
                }
            }
            (ComparisonOp::Eq, _) if target.list => {
                return Err(invalid_value(key, "a list", value));
            }
            (ComparisonOp::In, Val::List(elems)) => {
                for elem in elems {
                    check_scalar(&target.scalar, key, elem, true)?;
                }
            }
            (ComparisonOp::In, _) => return Err(FilterParseError::ExpectedList(key.to_string())),
            _ => check_scalar(&target.scalar, key, value, false)?,
        }

        Ok(FilterValue::Literal(value.clone()))
    }

    fn parse_relationship(
        &self,
        relationship_id: RelationshipId,
        quantifier: Quantifier,
        null_quantifier: Option<Quantifier>,
        key: &str,
        value: &Val,
    ) -> Result<FilterExpression, FilterParseError> {
        let relationship = self.schema.relationship(relationship_id);

        if value.is_null() {
            let quantifier =
                null_quantifier.ok_or_else(|| FilterParseError::ExpectedObject(key.to_string()))?;
            let branches = self
                .schema
                .concrete_types(relationship.target)
                .into_iter()
                .map(|type_id| RelationshipBranch {
                    type_id,
                    filter: None,
                })
                .collect();
            return Ok(FilterExpression::Relationship {
                relationship: relationship_id,
                quantifier,
                branches,
            });
        }

        let branches = self
            .member_values(relationship, key, value)?
            .into_iter()
            .map(|(type_id, value)| {
                Ok(RelationshipBranch {
                    type_id,
                    filter: Some(self.parse(type_id, value)?),
                })
            })
            .collect::<Result<Vec<_>, FilterParseError>>()?;

        Ok(FilterExpression::Relationship {
            relationship: relationship_id,
            quantifier,
            branches,
        })
    }

    fn parse_connection(
        &self,
        relationship_id: RelationshipId,
        quantifier: Quantifier,
        null_quantifier: Option<Quantifier>,
        key: &str,
        value: &Val,
    ) -> Result<FilterExpression, FilterParseError> {
        let relationship = self.schema.relationship(relationship_id);

        let (quantifier, branches) = if value.is_null() {
            let quantifier =
                null_quantifier.ok_or_else(|| FilterParseError::ExpectedObject(key.to_string()))?;
            let branches = self
                .schema
                .concrete_types(relationship.target)
                .into_iter()
                .map(|type_id| ConnectionBranch {
                    type_id,
                    predicate: ConnectionWhere::And(vec![]),
                })
                .collect();
            (quantifier, branches)
        } else {
            let branches = self
                .member_values(relationship, key, value)?
                .into_iter()
                .map(|(type_id, value)| {
                    Ok(ConnectionBranch {
                        type_id,
                        predicate: self.parse_connection_where(relationship, type_id, key, value)?,
                    })
                })
                .collect::<Result<Vec<_>, FilterParseError>>()?;
            (quantifier, branches)
        };

        Ok(FilterExpression::Connection {
            relationship: relationship_id,
            quantifier,
            branches,
        })
    }

    /// Parse `{ node: {...}, edge: {...}, AND, OR, NOT }` for one concrete target type
    pub fn parse_connection_where(
        &self,
        relationship: &RelationshipDescriptor,
        type_id: TypeId,
        key: &str,
        value: &Val,
    ) -> Result<ConnectionWhere, FilterParseError> {
        let object = expect_object(key, value)?;

        let predicates = object
            .iter()
            .map(|(inner_key, inner_value)| match inner_key.as_str() {
                "node" => Ok(ConnectionWhere::Node(self.parse(type_id, inner_value)?)),
                "edge" => {
                    let properties = relationship.properties.ok_or_else(|| {
                        FilterParseError::NoRelationshipProperties(relationship.field_name.clone())
                    })?;
                    Ok(ConnectionWhere::Edge(self.parse(properties, inner_value)?))
                }
                "AND" => Ok(ConnectionWhere::And(self.parse_list(
                    inner_key,
                    inner_value,
                    |v| self.parse_connection_where(relationship, type_id, key, v),
                )?)),
                "OR" => Ok(ConnectionWhere::Or(self.parse_list(
                    inner_key,
                    inner_value,
                    |v| self.parse_connection_where(relationship, type_id, key, v),
                )?)),
                "NOT" => Ok(ConnectionWhere::Not(Box::new(self.parse_connection_where(
                    relationship,
                    type_id,
                    key,
                    inner_value,
                )?))),
                _ => Err(FilterParseError::UnknownField {
                    type_name: format!("{}Connection", relationship.field_name),
                    field: inner_key.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if predicates.len() == 1 {
            predicates
                .into_iter()
                .next()
                .unwrap_or(ConnectionWhere::And(vec![]))
        } else {
            ConnectionWhere::And(predicates)
        })
    }

    /// Split a nested filter value by concrete target type. Union filters are keyed by member
    /// type; node and interface filters apply to every concrete type.
    fn member_values<'v>(
        &self,
        relationship: &RelationshipDescriptor,
        key: &str,
        value: &'v Val,
    ) -> Result<Vec<(TypeId, &'v Val)>, FilterParseError> {
        match &self.schema.types[relationship.target].kind {
            TypeKind::Union { members } => expect_object(key, value)?
                .iter()
                .map(|(member_name, member_value)| {
                    members
                        .iter()
                        .find(|member| self.schema.types[**member].name == *member_name)
                        .map(|member| (*member, member_value))
                        .ok_or_else(|| FilterParseError::UnknownMemberType {
                            field: key.to_string(),
                            member: member_name.clone(),
                        })
                })
                .collect(),
            _ => Ok(self
                .schema
                .concrete_types(relationship.target)
                .into_iter()
                .map(|type_id| (type_id, value))
                .collect()),
        }
    }

    fn parse_aggregate(
        &self,
        relationship_id: RelationshipId,
        key: &str,
        value: &Val,
    ) -> Result<FilterExpression, FilterParseError> {
        let relationship = self.schema.relationship(relationship_id);
        if !relationship.aggregate || !self.schema.types[relationship.target].is_node() {
            return Err(FilterParseError::AggregationUnavailable(key.to_string()));
        }

        Ok(FilterExpression::Aggregate {
            relationship: relationship_id,
            filter: self.parse_aggregate_where(relationship, key, value)?,
        })
    }

    fn parse_aggregate_where(
        &self,
        relationship: &RelationshipDescriptor,
        key: &str,
        value: &Val,
    ) -> Result<AggregateWhere, FilterParseError> {
        let object = expect_object(key, value)?;

        let predicates = object
            .iter()
            .map(|(inner_key, inner_value)| {
                if let Some((_, op)) = COUNT_OPERATORS.iter().find(|(name, _)| name == inner_key) {
                    let count = inner_value
                        .as_i64()
                        .ok_or_else(|| invalid_value(inner_key, "Int", inner_value))?;
                    return Ok(AggregateWhere::Count(*op, count));
                }
                match inner_key.as_str() {
                    "node" => self.parse_aggregate_side(
                        AggregateSide::Node,
                        relationship.target,
                        inner_key,
                        inner_value,
                    ),
                    "edge" => {
                        let properties = relationship.properties.ok_or_else(|| {
                            FilterParseError::NoRelationshipProperties(
                                relationship.field_name.clone(),
                            )
                        })?;
                        self.parse_aggregate_side(
                            AggregateSide::Edge,
                            properties,
                            inner_key,
                            inner_value,
                        )
                    }
                    "AND" => Ok(AggregateWhere::And(self.parse_list(
                        inner_key,
                        inner_value,
                        |v| self.parse_aggregate_where(relationship, key, v),
                    )?)),
                    "OR" => Ok(AggregateWhere::Or(self.parse_list(
                        inner_key,
                        inner_value,
                        |v| self.parse_aggregate_where(relationship, key, v),
                    )?)),
                    "NOT" => Ok(AggregateWhere::Not(Box::new(self.parse_aggregate_where(
                        relationship,
                        key,
                        inner_value,
                    )?))),
                    _ => Err(FilterParseError::UnknownField {
                        type_name: format!("{}Aggregate", relationship.field_name),
                        field: inner_key.to_string(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(aggregate_all(predicates))
    }

    fn parse_aggregate_side(
        &self,
        side: AggregateSide,
        type_id: TypeId,
        key: &str,
        value: &Val,
    ) -> Result<AggregateWhere, FilterParseError> {
        let typ = &self.schema.types[type_id];
        let object = expect_object(key, value)?;

        let predicates = object
            .iter()
            .map(|(inner_key, inner_value)| match inner_key.as_str() {
                "AND" => Ok(AggregateWhere::And(self.parse_list(
                    inner_key,
                    inner_value,
                    |v| self.parse_aggregate_side(side, type_id, key, v),
                )?)),
                "OR" => Ok(AggregateWhere::Or(self.parse_list(
                    inner_key,
                    inner_value,
                    |v| self.parse_aggregate_side(side, type_id, key, v),
                )?)),
                "NOT" => Ok(AggregateWhere::Not(Box::new(self.parse_aggregate_side(
                    side,
                    type_id,
                    key,
                    inner_value,
                )?))),
                _ => {
                    let unknown = || FilterParseError::UnknownField {
                        type_name: typ.name.clone(),
                        field: inner_key.to_string(),
                    };

                    let (rest, op) = NUMERIC_OPERATORS
                        .iter()
                        .find_map(|(suffix, op)| {
                            inner_key.strip_suffix(suffix).map(|rest| (rest, *op))
                        })
                        .ok_or_else(unknown)?;
                    let (field_name, function) = AGGREGATE_FUNCTIONS
                        .iter()
                        .find_map(|(suffix, function)| {
                            rest.strip_suffix(suffix).map(|name| (name, *function))
                        })
                        .ok_or_else(unknown)?;
                    let field = typ.field(field_name).ok_or_else(unknown)?;
                    let property = field.property().ok_or_else(unknown)?;
                    let target = property_target(field, property);

                    if !aggregate_applies(&target, function) {
                        return Err(FilterParseError::UnsupportedOperator {
                            type_name: typ.name.clone(),
                            field: field.name.clone(),
                            key: inner_key.to_string(),
                        });
                    }
                    check_aggregate_value(&target.scalar, function, inner_key, inner_value)?;

                    Ok(AggregateWhere::Property {
                        side,
                        property: target,
                        function,
                        op,
                        value: inner_value.clone(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(aggregate_all(predicates))
    }

    fn parse_list<T>(
        &self,
        key: &str,
        value: &Val,
        parse: impl Fn(&Val) -> Result<T, FilterParseError>,
    ) -> Result<Vec<T>, FilterParseError> {
        match value {
            Val::List(elems) => elems.iter().map(parse).collect(),
            _ => Err(FilterParseError::ExpectedList(key.to_string())),
        }
    }
}

fn aggregate_all(mut predicates: Vec<AggregateWhere>) -> AggregateWhere {
    if predicates.len() == 1 {
        predicates.remove(0)
    } else {
        AggregateWhere::And(predicates)
    }
}

pub fn property_target(field: &FieldDescriptor, property: &PropertyField) -> PropertyTarget {
    PropertyTarget {
        field_name: field.name.clone(),
        db_name: property.db_name.clone(),
        scalar: property.scalar.clone(),
        list: field.typ.list,
        coalesce: property.coalesce.clone(),
    }
}

fn expect_object<'v>(
    key: &str,
    value: &'v Val,
) -> Result<&'v IndexMap<String, Val>, FilterParseError> {
    value
        .as_object()
        .ok_or_else(|| FilterParseError::ExpectedObject(key.to_string()))
}

fn operator_applies(target: &PropertyTarget, op: ComparisonOp) -> bool {
    let scalar = &target.scalar;

    if target.list {
        return matches!(op, ComparisonOp::Eq | ComparisonOp::Includes);
    }
    match op {
        ComparisonOp::Eq => true,
        ComparisonOp::Includes => false,
        ComparisonOp::In => !matches!(scalar, ScalarType::Boolean),
        ComparisonOp::Lt | ComparisonOp::Lte | ComparisonOp::Gt | ComparisonOp::Gte => {
            scalar.is_ordered() || matches!(scalar, ScalarType::Custom(_))
        }
        ComparisonOp::Contains
        | ComparisonOp::StartsWith
        | ComparisonOp::EndsWith
        | ComparisonOp::Matches => {
            scalar.is_textual() || matches!(scalar, ScalarType::Custom(_))
        }
    }
}

fn aggregate_applies(target: &PropertyTarget, function: AggregateFunction) -> bool {
    if target.list {
        return false;
    }
    let scalar = &target.scalar;
    match function {
        AggregateFunction::ShortestLength
        | AggregateFunction::LongestLength
        | AggregateFunction::AverageLength => scalar.is_textual(),
        AggregateFunction::Min | AggregateFunction::Max => {
            scalar.is_numeric() || scalar.is_temporal()
        }
        AggregateFunction::Sum | AggregateFunction::Average => scalar.is_numeric(),
    }
}

fn check_aggregate_value(
    scalar: &ScalarType,
    function: AggregateFunction,
    key: &str,
    value: &Val,
) -> Result<(), FilterParseError> {
    let valid = match value {
        Val::Number(n) if function.is_average() => n.as_f64().is_finite(),
        Val::Number(n) if function.is_length() => n.is_integer(),
        Val::Number(n) => scalar.is_numeric() && (n.is_integer() || !scalar.is_integer()),
        Val::String(_) => scalar.is_temporal() && !function.is_average(),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        let expected = if function.is_average() {
            "Float"
        } else if function.is_length() {
            "Int"
        } else {
            scalar.type_name()
        };
        Err(invalid_value(key, expected, value))
    }
}

fn check_scalar(
    scalar: &ScalarType,
    key: &str,
    value: &Val,
    allow_null: bool,
) -> Result<(), FilterParseError> {
    let valid = match (scalar, value) {
        (_, Val::Null) => allow_null,
        (ScalarType::Int | ScalarType::BigInt, Val::Number(n)) => n.is_integer(),
        (ScalarType::BigInt, Val::String(s)) => s.parse::<i64>().is_ok(),
        (ScalarType::Float, Val::Number(_)) => true,
        (ScalarType::Id, Val::String(_) | Val::Number(_)) => true,
        (ScalarType::String, Val::String(_)) => true,
        (ScalarType::Boolean, Val::Bool(_)) => true,
        (ScalarType::Enum(_), Val::Enum(_) | Val::String(_)) => true,
        (ScalarType::Custom(_), _) => true,
        (scalar, Val::String(_)) => scalar.is_temporal(),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(invalid_value(key, scalar.type_name(), value))
    }
}

fn invalid_value(key: &str, expected: &str, value: &Val) -> FilterParseError {
    FilterParseError::InvalidValue {
        key: key.to_string(),
        expected: expected.to_string(),
        actual: value.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_schema::movie_schema;

    fn parse(schema: &Neo4jSchema, type_name: &str, value: serde_json::Value) -> FilterExpression {
        let (type_id, _) = schema.get_type(type_name).unwrap();
        FilterParser::new(schema).parse(type_id, &Val::from(value)).unwrap()
    }

    fn parse_err(
        schema: &Neo4jSchema,
        type_name: &str,
        value: serde_json::Value,
    ) -> FilterParseError {
        let (type_id, _) = schema.get_type(type_name).unwrap();
        FilterParser::new(schema)
            .parse(type_id, &Val::from(value))
            .unwrap_err()
    }

    fn comparison(expression: &FilterExpression) -> (&str, ComparisonOp, &FilterValue) {
        match expression {
            FilterExpression::Comparison(comparison) => (
                comparison.property.field_name.as_str(),
                comparison.op,
                &comparison.value,
            ),
            other => panic!("Expected a comparison, got {other:?}"),
        }
    }

    #[test]
    fn bare_field_is_equality() {
        let schema = movie_schema();
        let filter = parse(&schema, "Movie", json!({ "title": "The Matrix" }));

        let (field, op, value) = comparison(&filter);
        assert_eq!(field, "title");
        assert_eq!(op, ComparisonOp::Eq);
        assert_eq!(value, &FilterValue::Literal(Val::from("The Matrix")));
    }

    #[test]
    fn longest_suffix_wins() {
        let schema = movie_schema();

        let filter = parse(&schema, "Movie", json!({ "title_NOT_IN": ["A", "B"] }));
        match filter {
            FilterExpression::Not(inner) => {
                let (field, op, _) = comparison(&inner);
                assert_eq!(field, "title");
                assert_eq!(op, ComparisonOp::In);
            }
            other => panic!("Expected a negation, got {other:?}"),
        }

        let filter = parse(&schema, "Movie", json!({ "year_LTE": 1999 }));
        assert_eq!(comparison(&filter).1, ComparisonOp::Lte);
    }

    #[test]
    fn multiple_keys_are_conjoined() {
        let schema = movie_schema();
        let filter = parse(
            &schema,
            "Movie",
            json!({ "title_STARTS_WITH": "The", "year_GT": 1990 }),
        );

        match filter {
            FilterExpression::And(filters) => assert_eq!(filters.len(), 2),
            other => panic!("Expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn logical_operators() {
        let schema = movie_schema();
        let filter = parse(
            &schema,
            "Movie",
            json!({ "OR": [{ "title": "A" }, { "NOT": { "year": 1999 } }] }),
        );

        match filter {
            FilterExpression::Or(filters) => {
                assert_eq!(filters.len(), 2);
                assert!(matches!(filters[1], FilterExpression::Not(_)));
            }
            other => panic!("Expected a disjunction, got {other:?}"),
        }
    }

    #[test]
    fn relationship_quantifiers() {
        let schema = movie_schema();

        let filter = parse(&schema, "Movie", json!({ "actors_ALL": { "name": "Keanu" } }));
        match filter {
            FilterExpression::Relationship {
                quantifier,
                branches,
                ..
            } => {
                assert_eq!(quantifier, Quantifier::All);
                assert_eq!(branches.len(), 1);
                assert!(branches[0].filter.is_some());
            }
            other => panic!("Expected a relationship filter, got {other:?}"),
        }

        let filter = parse(&schema, "Movie", json!({ "actors": null }));
        assert!(matches!(
            filter,
            FilterExpression::Relationship {
                quantifier: Quantifier::None,
                ..
            }
        ));

        let filter = parse(&schema, "Movie", json!({ "actors_NOT": null }));
        assert!(matches!(
            filter,
            FilterExpression::Relationship {
                quantifier: Quantifier::Some,
                ..
            }
        ));

        assert_eq!(
            parse_err(&schema, "Movie", json!({ "actors_SOME": null })),
            FilterParseError::ExpectedObject("actors_SOME".to_string())
        );
    }

    #[test]
    fn union_branches_are_keyed_by_member() {
        let schema = movie_schema();
        let filter = parse(
            &schema,
            "Actor",
            json!({ "favorites_SOME": { "Movie": { "title": "A" } } }),
        );

        match filter {
            FilterExpression::Relationship { branches, .. } => {
                assert_eq!(branches.len(), 1);
                assert_eq!(schema.types[branches[0].type_id].name, "Movie");
            }
            other => panic!("Expected a relationship filter, got {other:?}"),
        }

        assert_eq!(
            parse_err(
                &schema,
                "Actor",
                json!({ "favorites_SOME": { "Series": { "title": "A" } } })
            ),
            FilterParseError::UnknownMemberType {
                field: "favorites_SOME".to_string(),
                member: "Series".to_string(),
            }
        );
    }

    #[test]
    fn connection_filters_reach_edge_properties() {
        let schema = movie_schema();
        let filter = parse(
            &schema,
            "Movie",
            json!({ "actorsConnection_SOME": { "node": { "name": "Keanu" }, "edge": { "role": "Neo" } } }),
        );

        match filter {
            FilterExpression::Connection {
                quantifier,
                branches,
                ..
            } => {
                assert_eq!(quantifier, Quantifier::Some);
                match &branches[0].predicate {
                    ConnectionWhere::And(parts) => {
                        assert!(matches!(parts[0], ConnectionWhere::Node(_)));
                        assert!(matches!(parts[1], ConnectionWhere::Edge(_)));
                    }
                    other => panic!("Expected a conjunction, got {other:?}"),
                }
            }
            other => panic!("Expected a connection filter, got {other:?}"),
        }

        assert_eq!(
            parse_err(
                &schema,
                "Actor",
                json!({ "favoritesConnection": { "Movie": { "edge": { "role": "Neo" } } } })
            ),
            FilterParseError::NoRelationshipProperties("favorites".to_string())
        );
    }

    #[test]
    fn aggregate_filters() {
        let schema = movie_schema();
        let filter = parse(
            &schema,
            "Movie",
            json!({ "actorsAggregate": {
                "count_GT": 2,
                "node": { "name_SHORTEST_LENGTH_LT": 5 },
                "edge": { "screenTime_AVERAGE_GTE": 10.5 }
            } }),
        );

        match filter {
            FilterExpression::Aggregate {
                filter: AggregateWhere::And(parts),
                ..
            } => {
                assert_eq!(parts[0], AggregateWhere::Count(NumericOp::Gt, 2));
                assert!(matches!(
                    parts[1],
                    AggregateWhere::Property {
                        side: AggregateSide::Node,
                        function: AggregateFunction::ShortestLength,
                        op: NumericOp::Lt,
                        ..
                    }
                ));
                assert!(matches!(
                    parts[2],
                    AggregateWhere::Property {
                        side: AggregateSide::Edge,
                        function: AggregateFunction::Average,
                        op: NumericOp::Gte,
                        ..
                    }
                ));
            }
            other => panic!("Expected an aggregate filter, got {other:?}"),
        }

        assert!(matches!(
            parse_err(
                &schema,
                "Movie",
                json!({ "actorsAggregate": { "node": { "name_SUM_LT": 5 } } })
            ),
            FilterParseError::UnsupportedOperator { .. }
        ));
        assert_eq!(
            parse_err(&schema, "Actor", json!({ "favoritesAggregate": { "count": 1 } })),
            FilterParseError::AggregationUnavailable("favoritesAggregate".to_string())
        );
    }

    #[test]
    fn operators_are_checked_against_field_types() {
        let schema = movie_schema();

        assert!(matches!(
            parse_err(&schema, "Movie", json!({ "year_CONTAINS": "19" })),
            FilterParseError::UnsupportedOperator { .. }
        ));
        assert!(matches!(
            parse_err(&schema, "Movie", json!({ "tags_LT": "a" })),
            FilterParseError::UnsupportedOperator { .. }
        ));
        assert_eq!(
            comparison(&parse(&schema, "Movie", json!({ "tags_INCLUDES": "scifi" }))).1,
            ComparisonOp::Includes
        );
        assert_eq!(
            comparison(&parse(
                &schema,
                "Movie",
                json!({ "released_GT": "2020-01-01T00:00:00Z" })
            ))
            .1,
            ComparisonOp::Gt
        );
    }

    #[test]
    fn values_are_checked() {
        let schema = movie_schema();

        assert_eq!(
            parse_err(&schema, "Movie", json!({ "year": "1999" })),
            FilterParseError::InvalidValue {
                key: "year".to_string(),
                expected: "Int".to_string(),
                actual: "String".to_string(),
            }
        );
        assert_eq!(
            parse_err(&schema, "Movie", json!({ "year_IN": 1999 })),
            FilterParseError::ExpectedList("year_IN".to_string())
        );
        assert_eq!(
            parse_err(&schema, "Movie", json!({ "rating": 5 })),
            FilterParseError::UnknownField {
                type_name: "Movie".to_string(),
                field: "rating".to_string(),
            }
        );
    }

    #[test]
    fn jwt_references_need_opt_in() {
        let schema = movie_schema();
        let (movie, _) = schema.get_type("Movie").unwrap();
        let value = Val::from(json!({ "title": "$jwt.sub" }));

        let filter = FilterParser::with_jwt_references(&schema)
            .parse(movie, &value)
            .unwrap();
        assert_eq!(
            comparison(&filter).2,
            &FilterValue::JwtClaim("sub".to_string())
        );

        let filter = FilterParser::new(&schema).parse(movie, &value).unwrap();
        assert_eq!(
            comparison(&filter).2,
            &FilterValue::Literal(Val::from("$jwt.sub"))
        );
    }

    #[test]
    fn undeclared_jwt_claims() {
        let schema = movie_schema();
        let filter = FilterParser::with_jwt_references(&schema)
            .parse_jwt(&Val::from(json!({ "roles_INCLUDES": "admin", "sub": "u1" })))
            .unwrap();

        match filter {
            FilterExpression::And(parts) => {
                let (field, op, _) = comparison(&parts[0]);
                assert_eq!((field, op), ("roles", ComparisonOp::Includes));
                let (field, op, _) = comparison(&parts[1]);
                assert_eq!((field, op), ("sub", ComparisonOp::Eq));
            }
            other => panic!("Expected a conjunction, got {other:?}"),
        }
    }
}
