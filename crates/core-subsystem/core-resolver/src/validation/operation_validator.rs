// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use async_graphql_parser::{
    Positioned,
    types::{FragmentDefinition, OperationDefinition, OperationType, VariableDefinition},
};
use async_graphql_value::{ConstValue, Name};
use serde_json::{Map, Value};

use crate::validation::validation_error::ValidationError;

use super::{operation::ValidatedOperation, selection_set_validator::SelectionSetValidator};

/// Context for validating an operation.
pub struct OperationValidator {
    operation_name: Option<String>,
    variables: Option<Map<String, Value>>,
    fragment_definitions: HashMap<Name, Positioned<FragmentDefinition>>,
    query_depth_limit: usize,
}

impl OperationValidator {
    #[must_use]
    pub fn new(
        operation_name: Option<String>,
        variables: Option<Map<String, Value>>,
        fragment_definitions: HashMap<Name, Positioned<FragmentDefinition>>,
        query_depth_limit: usize,
    ) -> Self {
        Self {
            operation_name,
            variables,
            fragment_definitions,
            query_depth_limit,
        }
    }

    /// Validate operation. Operation defines a GraphQL top-level operation such
    /// as
    /// ```graphql
    ///    mutation create($title: String!) {
    ///       createMovies(input: [{ title: $title }]) {
    ///          movies { title }
    ///       }
    ///    }
    /// ```
    ///
    /// Validations performed:
    /// - The operation is a query or a mutation
    /// - Each variables in [OperationDefinition.variable_definitions] is
    ///   available (see [`validate_variables`] for details)
    /// - The selected fields are valid (see [SelectionSetValidator] for details)
    ///
    /// # Returns
    ///   A validated operation with all variables and fields resolved and normalized.
    pub(super) fn validate(
        self,
        operation: Positioned<OperationDefinition>,
    ) -> Result<ValidatedOperation, ValidationError> {
        if operation.node.ty == OperationType::Subscription {
            return Err(ValidationError::SubscriptionNotSupported(operation.pos));
        }

        let variables = self.validate_variables(&operation.node.variable_definitions)?;
        let selection_set_validator = SelectionSetValidator::new(
            &variables,
            &self.fragment_definitions,
            self.query_depth_limit,
        );

        let fields = selection_set_validator.validate(&operation.node.selection_set, 0)?;

        Ok(ValidatedOperation {
            name: self.operation_name,
            typ: operation.node.ty,
            fields,
        })
    }

    /// Validate variables.
    ///
    /// Validations performed:
    /// - All non-null variables in [OperationDefinition.variable_definitions] without a default
    ///   value are available
    ///
    /// # Returns
    ///   Resolved variables (note the output type uses `ConstValue` instead of
    ///   `Value` to indicate that the value has been resolved)
    fn validate_variables(
        &self,
        variable_definitions: &[Positioned<VariableDefinition>],
    ) -> Result<HashMap<Name, ConstValue>, ValidationError> {
        variable_definitions
            .iter()
            .map(|variable_definition| {
                let variable_name = &variable_definition.node.name;
                let variable_value = self.var_value(variable_definition)?;
                Ok((variable_name.node.clone(), variable_value))
            })
            .collect()
    }

    fn var_value(
        &self,
        definition: &Positioned<VariableDefinition>,
    ) -> Result<ConstValue, ValidationError> {
        let name = &definition.node.name;
        let provided = self
            .variables
            .as_ref()
            .and_then(|variables| variables.get(name.node.as_str()));

        match provided {
            Some(resolved) => ConstValue::from_json(resolved.to_owned()).map_err(|e| {
                ValidationError::MalformedVariable(name.node.to_string(), name.pos, e)
            }),
            None => match &definition.node.default_value {
                Some(default_value) => Ok(default_value.node.clone()),
                None if definition.node.var_type.node.nullable => Ok(ConstValue::Null),
                None => Err(ValidationError::VariableNotFound(
                    name.node.to_string(),
                    name.pos,
                )),
            },
        }
    }
}
