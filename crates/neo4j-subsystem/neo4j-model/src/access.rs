// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! # Authorization rules
//!
//! Rules come from `@authorization(filter: [...], validate: [...])` on a type or a field. Each rule
//! carries a predicate over the node being accessed (`where: { node: ... }`) and/or over the
//! caller's JWT claims (`where: { jwt: ... }`). The node part is translated to Cypher; the JWT
//! part is solved at translation time, since the claims are known then.

use serde::{Deserialize, Serialize};

use crate::filter::FilterExpression;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Read,
    Aggregate,
    Create,
    Update,
    Delete,
    CreateRelationship,
    DeleteRelationship,
}

impl AuthOperation {
    pub const ALL: [AuthOperation; 7] = [
        AuthOperation::Read,
        AuthOperation::Aggregate,
        AuthOperation::Create,
        AuthOperation::Update,
        AuthOperation::Delete,
        AuthOperation::CreateRelationship,
        AuthOperation::DeleteRelationship,
    ];

    /// Filters can't narrow a node that doesn't exist yet, so `CREATE` is not a default
    pub const FILTER_DEFAULT: [AuthOperation; 6] = [
        AuthOperation::Read,
        AuthOperation::Aggregate,
        AuthOperation::Update,
        AuthOperation::Delete,
        AuthOperation::CreateRelationship,
        AuthOperation::DeleteRelationship,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "READ" => AuthOperation::Read,
            "AGGREGATE" => AuthOperation::Aggregate,
            "CREATE" => AuthOperation::Create,
            "UPDATE" => AuthOperation::Update,
            "DELETE" => AuthOperation::Delete,
            "CREATE_RELATIONSHIP" => AuthOperation::CreateRelationship,
            "DELETE_RELATIONSHIP" => AuthOperation::DeleteRelationship,
            _ => return None,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTiming {
    /// Checked against the data as matched, before any writes
    Before,
    /// Checked against the data as written
    After,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AuthorizationAnnotation {
    pub filter: Vec<FilterRule>,
    pub validate: Vec<ValidateRule>,
}

impl AuthorizationAnnotation {
    pub fn filters_for(&self, operation: AuthOperation) -> impl Iterator<Item = &FilterRule> {
        self.filter
            .iter()
            .filter(move |rule| rule.operations.contains(&operation))
    }

    pub fn validations_for(
        &self,
        operation: AuthOperation,
        timing: ValidationTiming,
    ) -> impl Iterator<Item = &ValidateRule> {
        self.validate.iter().filter(move |rule| {
            rule.operations.contains(&operation) && rule.when.contains(&timing)
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FilterRule {
    pub operations: Vec<AuthOperation>,
    pub require_authentication: bool,
    pub predicate: AuthPredicate,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidateRule {
    pub operations: Vec<AuthOperation>,
    pub when: Vec<ValidationTiming>,
    pub require_authentication: bool,
    pub predicate: AuthPredicate,
}

/// The `where` of an authorization rule
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum AuthPredicate {
    /// Filter over the node being accessed (may refer to claims with `"$jwt.<path>"` values)
    Node(FilterExpression),
    /// Filter over the JWT claims; the property targets are claim paths
    Jwt(FilterExpression),
    And(Vec<AuthPredicate>),
    Or(Vec<AuthPredicate>),
    Not(Box<AuthPredicate>),
}

/// `@authentication(operations: [...])`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthenticationAnnotation {
    pub operations: Vec<AuthOperation>,
}

impl AuthenticationAnnotation {
    pub fn applies_to(&self, operation: AuthOperation) -> bool {
        self.operations.contains(&operation)
    }
}
