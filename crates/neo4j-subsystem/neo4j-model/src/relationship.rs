// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::types::TypeId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationshipId(pub usize);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipDirection {
    /// `(owner)<-[:TYPE]-(target)`
    In,
    /// `(owner)-[:TYPE]->(target)`
    Out,
}

impl RelationshipDirection {
    pub fn reversed(self) -> Self {
        match self {
            RelationshipDirection::In => RelationshipDirection::Out,
            RelationshipDirection::Out => RelationshipDirection::In,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDirection {
    DefaultDirected,
    DefaultUndirected,
    DirectedOnly,
    UndirectedOnly,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NestedOperation {
    Create,
    Connect,
    Update,
    Delete,
    Disconnect,
    ConnectOrCreate,
}

impl NestedOperation {
    pub const ALL: [NestedOperation; 6] = [
        NestedOperation::Create,
        NestedOperation::Connect,
        NestedOperation::Update,
        NestedOperation::Delete,
        NestedOperation::Disconnect,
        NestedOperation::ConnectOrCreate,
    ];

    /// The input key for the operation in a relationship input (`connectOrCreate` etc.)
    pub fn input_name(self) -> &'static str {
        match self {
            NestedOperation::Create => "create",
            NestedOperation::Connect => "connect",
            NestedOperation::Update => "update",
            NestedOperation::Delete => "delete",
            NestedOperation::Disconnect => "disconnect",
            NestedOperation::ConnectOrCreate => "connectOrCreate",
        }
    }
}

/// A relationship field (`Movie.actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN)`).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RelationshipDescriptor {
    pub owner: TypeId,
    pub field_name: String,
    /// A node type, or an interface/union of node types
    pub target: TypeId,
    pub rel_type: String,
    pub direction: RelationshipDirection,
    pub cardinality: Cardinality,
    /// Non-null to-one relationships must have exactly one edge
    pub required: bool,
    pub properties: Option<TypeId>,
    pub nested_operations: Vec<NestedOperation>,
    pub aggregate: bool,
    pub query_direction: QueryDirection,
    /// The field declaring the same relationship from the target's side, if any
    pub reverse: Option<RelationshipId>,
}

impl RelationshipDescriptor {
    pub fn allows(&self, operation: NestedOperation) -> bool {
        self.nested_operations.contains(&operation)
    }

    /// Whether a traversal is directed, given the `directed` argument supplied by the client
    pub fn is_directed(&self, requested: Option<bool>) -> bool {
        match self.query_direction {
            QueryDirection::DirectedOnly => true,
            QueryDirection::UndirectedOnly => false,
            QueryDirection::DefaultDirected => requested.unwrap_or(true),
            QueryDirection::DefaultUndirected => requested.unwrap_or(false),
        }
    }
}
