// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_value::Name;
use indexmap::IndexMap;
use serde::Serialize;

use common::value::Val;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedField {
    pub alias: Option<Name>,
    /// The name of the field.
    pub name: Name,
    /// The arguments to the field, empty if no arguments are provided.
    pub arguments: IndexMap<String, Val>,

    /// The type named by the enclosing fragment (`... on Movie { title }`), if any. A field with a
    /// type condition applies only to values of that type.
    pub type_condition: Option<String>,

    /// The subfields being selected in this field, if it is an object. Empty if no fields are
    /// being selected.
    pub subfields: Vec<ValidatedField>,
}

impl ValidatedField {
    pub fn output_name(&self) -> String {
        self.alias.as_ref().unwrap_or(&self.name).to_string()
    }

    pub fn get_argument(&self, name: &str) -> Option<&Val> {
        self.arguments.get(name).filter(|value| !value.is_null())
    }

    /// Does this field apply to an object of the given concrete type (or any of the abstract types
    /// it implements)?
    pub fn applies_to(&self, type_name: &str, supertypes: &[&str]) -> bool {
        match &self.type_condition {
            None => true,
            Some(condition) => condition == type_name || supertypes.contains(&condition.as_str()),
        }
    }
}
