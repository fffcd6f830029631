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
    Pos, Positioned,
    types::{Directive, Field, FragmentDefinition, Selection, SelectionSet},
};
use async_graphql_value::{ConstValue, Name, Value};
use indexmap::IndexMap;

use common::value::Val;

use super::{field::ValidatedField, validation_error::ValidationError};

/// Context for validating a selection set.
pub(super) struct SelectionSetValidator<'a> {
    variables: &'a HashMap<Name, ConstValue>,
    fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    depth_limit: usize,
}

impl<'a> SelectionSetValidator<'a> {
    #[must_use]
    pub fn new(
        variables: &'a HashMap<Name, ConstValue>,
        fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
        depth_limit: usize,
    ) -> Self {
        Self {
            variables,
            fragment_definitions,
            depth_limit,
        }
    }

    /// Validate selection set.
    ///
    /// Validations performed:
    /// - Fragment spreads refer to existing, non-recursive fragments
    /// - `@skip`/`@include` have a boolean condition
    /// - Fields with the same output name (and type condition) select the same field with the same
    ///   arguments, so they can be merged
    /// - The selection isn't nested deeper than the depth limit
    ///
    /// # Returns
    ///   The fields in the selection set with fragments flattened and duplicates merged
    pub fn validate(
        &self,
        selection_set: &'a Positioned<SelectionSet>,
        depth: usize,
    ) -> Result<Vec<ValidatedField>, ValidationError> {
        let mut fields = vec![];
        self.collect_fields(selection_set, None, depth, &mut vec![], &mut fields)?;
        merge_fields(fields)
    }

    fn collect_fields(
        &self,
        selection_set: &'a Positioned<SelectionSet>,
        type_condition: Option<&'a str>,
        depth: usize,
        fragment_stack: &mut Vec<&'a Name>,
        fields: &mut Vec<(ValidatedField, Pos)>,
    ) -> Result<(), ValidationError> {
        for selection in &selection_set.node.items {
            match &selection.node {
                Selection::Field(field) => {
                    if self.included(&field.node.directives)? {
                        fields.push((
                            self.validate_field(field, type_condition, depth)?,
                            field.pos,
                        ));
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !self.included(&spread.node.directives)? {
                        continue;
                    }
                    let fragment_name = &spread.node.fragment_name.node;
                    if fragment_stack.contains(&fragment_name) {
                        return Err(ValidationError::FragmentCycle(
                            fragment_name.to_string(),
                            spread.pos,
                        ));
                    }
                    let definition =
                        self.fragment_definitions
                            .get(fragment_name)
                            .ok_or_else(|| {
                                ValidationError::FragmentDefinitionNotFound(
                                    fragment_name.to_string(),
                                    spread.pos,
                                )
                            })?;
                    if !self.included(&definition.node.directives)? {
                        continue;
                    }

                    fragment_stack.push(fragment_name);
                    self.collect_fields(
                        &definition.node.selection_set,
                        Some(definition.node.type_condition.node.on.node.as_str()),
                        depth,
                        fragment_stack,
                        fields,
                    )?;
                    fragment_stack.pop();
                }
                Selection::InlineFragment(fragment) => {
                    if !self.included(&fragment.node.directives)? {
                        continue;
                    }
                    let condition = fragment
                        .node
                        .type_condition
                        .as_ref()
                        .map(|condition| condition.node.on.node.as_str())
                        .or(type_condition);
                    self.collect_fields(
                        &fragment.node.selection_set,
                        condition,
                        depth,
                        fragment_stack,
                        fields,
                    )?;
                }
            }
        }

        Ok(())
    }

    fn validate_field(
        &self,
        field: &'a Positioned<Field>,
        type_condition: Option<&str>,
        depth: usize,
    ) -> Result<ValidatedField, ValidationError> {
        if depth > self.depth_limit {
            return Err(ValidationError::SelectionSetTooDeep(field.pos));
        }

        let arguments = field
            .node
            .arguments
            .iter()
            .map(|(name, value)| {
                let value = self.resolve_value(value)?;
                let value = Val::try_from(value).map_err(|e| {
                    ValidationError::MalformedArgument(name.node.to_string(), name.pos, e)
                })?;
                Ok((name.node.to_string(), value))
            })
            .collect::<Result<IndexMap<_, _>, ValidationError>>()?;

        Ok(ValidatedField {
            alias: field.node.alias.as_ref().map(|alias| alias.node.clone()),
            name: field.node.name.node.clone(),
            arguments,
            type_condition: type_condition.map(|condition| condition.to_string()),
            subfields: self.validate(&field.node.selection_set, depth + 1)?,
        })
    }

    fn resolve_value(&self, value: &Positioned<Value>) -> Result<ConstValue, ValidationError> {
        value.node.clone().into_const_with(|name| {
            self.variables
                .get(&name)
                .cloned()
                .ok_or_else(|| ValidationError::VariableNotFound(name.to_string(), value.pos))
        })
    }

    /// Evaluate `@skip(if:)` and `@include(if:)`
    fn included(&self, directives: &[Positioned<Directive>]) -> Result<bool, ValidationError> {
        for directive in directives {
            let directive_name = directive.node.name.node.as_str();
            if directive_name != "skip" && directive_name != "include" {
                continue;
            }

            let condition = match directive.node.get_argument("if") {
                Some(value) => match self.resolve_value(value)? {
                    ConstValue::Boolean(condition) => condition,
                    _ => {
                        return Err(ValidationError::InvalidDirectiveArgument(
                            directive_name.to_string(),
                            directive.pos,
                        ));
                    }
                },
                None => {
                    return Err(ValidationError::InvalidDirectiveArgument(
                        directive_name.to_string(),
                        directive.pos,
                    ));
                }
            };

            if (directive_name == "skip") == condition {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Merge fields that share an output name (and type condition), concatenating their subfields.
fn merge_fields(fields: Vec<(ValidatedField, Pos)>) -> Result<Vec<ValidatedField>, ValidationError> {
    let mut merged: IndexMap<(String, Option<String>), (ValidatedField, Pos)> = IndexMap::new();

    for (field, pos) in fields {
        let key = (field.output_name(), field.type_condition.clone());
        match merged.get_mut(&key) {
            Some((existing, _)) => {
                if existing.name != field.name || existing.arguments != field.arguments {
                    return Err(ValidationError::FieldConflict(key.0, pos));
                }
                let subfields = std::mem::take(&mut existing.subfields)
                    .into_iter()
                    .chain(field.subfields)
                    .map(|subfield| (subfield, pos))
                    .collect();
                existing.subfields = merge_fields(subfields)?;
            }
            None => {
                merged.insert(key, (field, pos));
            }
        }
    }

    Ok(merged.into_values().map(|(field, _)| field).collect())
}
