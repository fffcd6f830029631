// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::Pos;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0}")]
    QueryParsingFailed(String, Pos),

    #[error("Variable '{0}' not found")]
    VariableNotFound(String, Pos),

    #[error("Variable '{0}' could not be deserialized: {2}")]
    MalformedVariable(String, Pos, serde_json::Error),

    #[error("Argument '{0}' could not be converted: {2}")]
    MalformedArgument(String, Pos, serde_json::Error),

    #[error("Fragment definition '{0}' not found")]
    FragmentDefinitionNotFound(String, Pos),

    #[error("Fragment '{0}' spreads itself")]
    FragmentCycle(String, Pos),

    #[error("Directive '@{0}' requires a Boolean 'if' argument")]
    InvalidDirectiveArgument(String, Pos),

    #[error("Fields '{0}' conflict because they select different fields or arguments")]
    FieldConflict(String, Pos),

    #[error("Subscriptions are not supported")]
    SubscriptionNotSupported(Pos),

    #[error("Selection set too deep")]
    SelectionSetTooDeep(Pos),

    #[error("No operation found")]
    NoOperationFound,

    #[error("Must provide operation name if query contains multiple operations")]
    MultipleOperationsNoOperationName,

    #[error("operationName '{0}' doesn't match any operation")]
    MultipleOperationsUnmatchedOperationName(String),
}

impl ValidationError {
    pub fn position(&self) -> Pos {
        match self {
            ValidationError::QueryParsingFailed(_, pos) => *pos,
            ValidationError::VariableNotFound(_, pos) => *pos,
            ValidationError::MalformedVariable(_, pos, _) => *pos,
            ValidationError::MalformedArgument(_, pos, _) => *pos,
            ValidationError::FragmentDefinitionNotFound(_, pos) => *pos,
            ValidationError::FragmentCycle(_, pos) => *pos,
            ValidationError::InvalidDirectiveArgument(_, pos) => *pos,
            ValidationError::FieldConflict(_, pos) => *pos,
            ValidationError::SubscriptionNotSupported(pos) => *pos,
            ValidationError::SelectionSetTooDeep(pos) => *pos,
            ValidationError::NoOperationFound => Pos::default(),
            ValidationError::MultipleOperationsNoOperationName => Pos::default(),
            ValidationError::MultipleOperationsUnmatchedOperationName(_) => Pos::default(),
        }
    }
}
