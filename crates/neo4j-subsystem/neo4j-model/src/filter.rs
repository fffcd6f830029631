// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The intermediate form of a `where` argument.
//!
//! The filter parser turns the input object into this tree after checking every key against the
//! schema, so the Cypher mapping never has to deal with unknown fields or operators.

use serde::{Deserialize, Serialize};

use common::value::Val;

use crate::{relationship::RelationshipId, types::ScalarType, types::TypeId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum FilterExpression {
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
    Not(Box<FilterExpression>),
    Comparison(PropertyComparison),
    /// `actors_SOME: { name: "Keanu" }`, `actors: null`, etc.
    Relationship {
        relationship: RelationshipId,
        quantifier: Quantifier,
        /// One branch per concrete target type
        branches: Vec<RelationshipBranch>,
    },
    /// `actorsConnection_SOME: { node: {...}, edge: {...} }`
    Connection {
        relationship: RelationshipId,
        quantifier: Quantifier,
        branches: Vec<ConnectionBranch>,
    },
    /// `actorsAggregate: { count_GT: 2 }`
    Aggregate {
        relationship: RelationshipId,
        filter: AggregateWhere,
    },
}

impl FilterExpression {
    /// Combine several expressions, avoiding a wrapper for a single one
    pub fn all(mut expressions: Vec<FilterExpression>) -> FilterExpression {
        if expressions.len() == 1 {
            expressions.remove(0)
        } else {
            FilterExpression::And(expressions)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    All,
    None,
    Single,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RelationshipBranch {
    pub type_id: TypeId,
    /// `None` when only the existence of a related node matters
    pub filter: Option<FilterExpression>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConnectionBranch {
    pub type_id: TypeId,
    pub predicate: ConnectionWhere,
}

/// The `where` of a connection: conditions on the related node and on the edge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ConnectionWhere {
    And(Vec<ConnectionWhere>),
    Or(Vec<ConnectionWhere>),
    Not(Box<ConnectionWhere>),
    Node(FilterExpression),
    Edge(FilterExpression),
}

/// The property a comparison reads
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PropertyTarget {
    pub field_name: String,
    /// Property name in the database, or the claim path for JWT filters
    pub db_name: String,
    pub scalar: ScalarType,
    pub list: bool,
    /// Value compared instead of `null` (`@coalesce`)
    pub coalesce: Option<Val>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    In,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    /// List property contains the value
    Includes,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum FilterValue {
    Literal(Val),
    /// `"$jwt.sub"` in an authorization rule
    JwtClaim(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PropertyComparison {
    pub property: PropertyTarget,
    pub op: ComparisonOp,
    pub value: FilterValue,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Equal,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    ShortestLength,
    LongestLength,
    AverageLength,
    Min,
    Max,
    Sum,
    Average,
}

impl AggregateFunction {
    /// Averages compare against a float; everything else against a value of the data's own type
    pub fn is_average(self) -> bool {
        matches!(
            self,
            AggregateFunction::Average | AggregateFunction::AverageLength
        )
    }

    pub fn is_length(self) -> bool {
        matches!(
            self,
            AggregateFunction::ShortestLength
                | AggregateFunction::LongestLength
                | AggregateFunction::AverageLength
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateSide {
    Node,
    Edge,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum AggregateWhere {
    And(Vec<AggregateWhere>),
    Or(Vec<AggregateWhere>),
    Not(Box<AggregateWhere>),
    Count(NumericOp, i64),
    Property {
        side: AggregateSide,
        property: PropertyTarget,
        function: AggregateFunction,
        op: NumericOp,
        value: Val,
    },
}
