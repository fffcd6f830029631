// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Typed access to directive arguments.

use async_graphql_parser::{Positioned, types::ConstDirective};
use async_graphql_value::ConstValue;

use common::value::Val;

use crate::error::SchemaError;

/// Directives that may appear on types
pub(crate) const TYPE_DIRECTIVES: [&str; 6] = [
    "node",
    "relationshipProperties",
    "authorization",
    "authentication",
    "jwt",
    "deprecated",
];

/// Directives that may appear on fields
pub(crate) const FIELD_DIRECTIVES: [&str; 13] = [
    "relationship",
    "cypher",
    "customResolver",
    "alias",
    "id",
    "unique",
    "timestamp",
    "default",
    "coalesce",
    "populatedBy",
    "authorization",
    "deprecated",
    "specifiedBy",
];

/// Directives that may appear on the fields of the `@jwt` type
pub(crate) const JWT_FIELD_DIRECTIVES: [&str; 2] = ["jwtClaim", "deprecated"];

/// The directives on one type or field, with the location used in errors
pub(crate) struct Directives<'a> {
    directives: &'a [Positioned<ConstDirective>],
    type_name: &'a str,
    field_name: Option<&'a str>,
}

impl<'a> Directives<'a> {
    pub fn new(
        directives: &'a [Positioned<ConstDirective>],
        type_name: &'a str,
        field_name: Option<&'a str>,
    ) -> Self {
        Self {
            directives,
            type_name,
            field_name,
        }
    }

    /// Fail on a directive not in `known`
    pub fn check_known(&self, known: &[&str]) -> Result<(), SchemaError> {
        match self
            .directives
            .iter()
            .find(|directive| !known.contains(&directive.node.name.node.as_str()))
        {
            Some(directive) => Err(self.error(
                directive.node.name.node.as_str(),
                "unknown or misplaced directive",
            )),
            None => Ok(()),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Directive<'a>> {
        self.directives
            .iter()
            .find(|directive| directive.node.name.node == name)
            .map(|directive| Directive {
                directive: &directive.node,
                type_name: self.type_name,
                field_name: self.field_name,
            })
    }

    pub fn error(&self, directive: &str, message: impl Into<String>) -> SchemaError {
        SchemaError::invalid_directive(self.type_name, self.field_name, directive, message)
    }
}

pub(crate) struct Directive<'a> {
    directive: &'a ConstDirective,
    type_name: &'a str,
    field_name: Option<&'a str>,
}

impl Directive<'_> {
    pub fn name(&self) -> &str {
        self.directive.name.node.as_str()
    }

    pub fn argument(&self, name: &str) -> Option<&ConstValue> {
        self.directive
            .get_argument(name)
            .map(|argument| &argument.node)
    }

    pub fn error(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::invalid_directive(self.type_name, self.field_name, self.name(), message)
    }

    pub fn string(&self, name: &str) -> Result<Option<String>, SchemaError> {
        match self.argument(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(self.error(format!("'{name}' must be a string"))),
        }
    }

    pub fn required_string(&self, name: &str) -> Result<String, SchemaError> {
        self.string(name)?
            .ok_or_else(|| self.error(format!("missing argument '{name}'")))
    }

    pub fn boolean(&self, name: &str, default: bool) -> Result<bool, SchemaError> {
        match self.argument(name) {
            None | Some(ConstValue::Null) => Ok(default),
            Some(ConstValue::Boolean(value)) => Ok(*value),
            Some(_) => Err(self.error(format!("'{name}' must be a boolean"))),
        }
    }

    /// An enum argument (also accepted as a string)
    pub fn enum_value(&self, name: &str) -> Result<Option<String>, SchemaError> {
        match self.argument(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::Enum(value)) => Ok(Some(value.to_string())),
            Some(ConstValue::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(self.error(format!("'{name}' must be an enum value"))),
        }
    }

    /// A list of enum values; a single value is accepted as a one-element list
    pub fn enum_list(&self, name: &str) -> Result<Option<Vec<String>>, SchemaError> {
        let element = |value: &ConstValue| match value {
            ConstValue::Enum(value) => Ok(value.to_string()),
            ConstValue::String(value) => Ok(value.clone()),
            _ => Err(self.error(format!("'{name}' must be a list of enum values"))),
        };

        match self.argument(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::List(values)) => values
                .iter()
                .map(element)
                .collect::<Result<_, _>>()
                .map(Some),
            Some(value) => element(value).map(|value| Some(vec![value])),
        }
    }

    pub fn string_list(&self, name: &str) -> Result<Option<Vec<String>>, SchemaError> {
        let element = |value: &ConstValue| match value {
            ConstValue::String(value) => Ok(value.clone()),
            _ => Err(self.error(format!("'{name}' must be a list of strings"))),
        };

        match self.argument(name) {
            None | Some(ConstValue::Null) => Ok(None),
            Some(ConstValue::List(values)) => values
                .iter()
                .map(element)
                .collect::<Result<_, _>>()
                .map(Some),
            Some(value) => element(value).map(|value| Some(vec![value])),
        }
    }

    pub fn value(&self, name: &str) -> Result<Option<Val>, SchemaError> {
        self.argument(name)
            .map(|value| {
                Val::try_from(value.clone())
                    .map_err(|_| self.error(format!("'{name}' is not a valid value")))
            })
            .transpose()
    }

    /// Map each enum value of a list argument, defaulting when the argument is absent
    pub fn enum_list_with<T>(
        &self,
        name: &str,
        default: &[T],
        map: impl Fn(&str) -> Option<T>,
    ) -> Result<Vec<T>, SchemaError>
    where
        T: Clone,
    {
        match self.enum_list(name)? {
            None => Ok(default.to_vec()),
            Some(values) => values
                .iter()
                .map(|value| {
                    map(value).ok_or_else(|| {
                        self.error(format!("'{value}' is not a valid value for '{name}'"))
                    })
                })
                .collect(),
        }
    }
}
