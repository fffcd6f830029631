// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{0}")]
    Generic(String),

    #[error("Could not parse the schema: {0}")]
    Parse(String),

    #[error("Unknown type '{name}' referenced by {referenced_by}")]
    UnknownType { name: String, referenced_by: String },

    #[error("Invalid @{directive} on {}: {message}", location(type_name, field_name.as_deref()))]
    InvalidDirective {
        type_name: String,
        field_name: Option<String>,
        directive: String,
        message: String,
    },

    #[error("Inconsistent relationship {type_name}.{field_name}: {message}")]
    InconsistentRelationship {
        type_name: String,
        field_name: String,
        message: String,
    },

    #[error("Property '{property}' of type '{type_name}' is used by more than one field")]
    AliasCollision { type_name: String, property: String },

    #[error("Invalid @cypher field {type_name}.{field_name}: {message}")]
    InvalidCypherField {
        type_name: String,
        field_name: String,
        message: String,
    },

    #[error("Invalid @authorization on {type_name}: {message}")]
    InvalidAuthorization { type_name: String, message: String },
}

fn location(type_name: &str, field_name: Option<&str>) -> String {
    match field_name {
        Some(field_name) => format!("{type_name}.{field_name}"),
        None => type_name.to_string(),
    }
}

impl SchemaError {
    pub(crate) fn invalid_directive(
        type_name: &str,
        field_name: Option<&str>,
        directive: &str,
        message: impl Into<String>,
    ) -> Self {
        SchemaError::InvalidDirective {
            type_name: type_name.to_string(),
            field_name: field_name.map(|name| name.to_string()),
            directive: directive.to_string(),
            message: message.into(),
        }
    }
}
