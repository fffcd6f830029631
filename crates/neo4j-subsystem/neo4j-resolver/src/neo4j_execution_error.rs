// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use neo4j_model::filter_parser::FilterParseError;
use thiserror::Error;
use tracing::error;

use crate::cast::CastError;

/// Message raised by `apoc.util.validatePredicate` when an authorization rule fails
pub const FORBIDDEN: &str = "@neo4j/graphql/FORBIDDEN";

/// Prefix of the message raised by a cardinality check, followed by `<Type>.<field> <message>`
pub const RELATIONSHIP_REQUIRED: &str = "@neo4j/graphql/RELATIONSHIP-REQUIRED";

#[derive(Error, Debug)]
pub enum Neo4jExecutionError {
    #[error("{0}")]
    Generic(String),

    #[error("Invalid field '{0}': {1}")]
    Validation(String, String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("{type_name}.{field_name} {message}")]
    Cardinality {
        type_name: String,
        field_name: String,
        message: String,
    },

    #[error("Missing argument '{0}'")]
    MissingArgument(String),

    #[error("{0}")]
    Cast(#[from] CastError),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<Neo4jExecutionError>),
}

impl Neo4jExecutionError {
    pub fn with_context(self, context: String) -> Neo4jExecutionError {
        Neo4jExecutionError::WithContext(context, Box::new(self))
    }

    /// A `where` (or other filter-shaped) argument that didn't parse
    pub fn invalid_filter(argument: &str, error: FilterParseError) -> Neo4jExecutionError {
        Neo4jExecutionError::Validation(argument.to_string(), error.to_string())
    }

    pub fn user_error_message(&self) -> String {
        match self {
            Neo4jExecutionError::Validation(_, _)
            | Neo4jExecutionError::MissingArgument(_)
            | Neo4jExecutionError::Cardinality { .. } => self.to_string(),
            Neo4jExecutionError::Forbidden(_) => "Forbidden".to_string(),
            Neo4jExecutionError::Unauthenticated => "Unauthenticated".to_string(),
            Neo4jExecutionError::Cast(e) => {
                error!("Cast error: {}", e);
                "Unable to convert input to the expected type".to_string()
            }
            Neo4jExecutionError::WithContext(context, e) => {
                format!("{}: {}", e.user_error_message(), context)
            }
            // Internal details (statement text, schema inconsistencies) stay in the logs
            Neo4jExecutionError::Generic(_) => {
                error!("Translation failed: {:?}", self);
                "Operation failed".to_string()
            }
        }
    }

    /// Map an error raised by an assertion embedded in a statement back to a typed error.
    ///
    /// Returns `None` for database errors that did not come from such an assertion.
    pub fn from_database_message(message: &str) -> Option<Neo4jExecutionError> {
        if let Some(index) = message.find(RELATIONSHIP_REQUIRED) {
            let rest = &message[index + RELATIONSHIP_REQUIRED.len()..];
            let (path, message) = rest.split_once(' ')?;
            let (type_name, field_name) = path.split_once('.')?;

            return Some(Neo4jExecutionError::Cardinality {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
                message: message.trim().to_string(),
            });
        }

        if message.contains(FORBIDDEN) {
            return Some(Neo4jExecutionError::Forbidden(
                "an authorization rule failed".to_string(),
            ));
        }

        None
    }
}

pub trait WithContext {
    fn with_context(self, context: String) -> Self;
}

impl<T> WithContext for Result<T, Neo4jExecutionError> {
    fn with_context(self, context: String) -> Result<T, Neo4jExecutionError> {
        self.map_err(|e| e.with_context(context))
    }
}
