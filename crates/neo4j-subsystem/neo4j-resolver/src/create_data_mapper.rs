// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use common::value::Val;
use exo_cypher::{Expression, SetItem, Variable};
use neo4j_model::types::{FieldDescriptor, FieldKind, TypeId, WriteOperation};

use crate::{
    cast::value_expression, cypher_mapper::CypherMapper,
    neo4j_execution_error::Neo4jExecutionError, translation::Translation,
};

/// The properties of a node (or relationship) being created
pub(crate) struct CreateInput<'a> {
    pub type_id: TypeId,
    pub entity: &'a Variable,
}

impl<'a> CypherMapper<'a, Vec<SetItem>> for CreateInput<'_> {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<Vec<SetItem>, Neo4jExecutionError> {
        let entries = input_object(argument, translation.typ(self.type_id).name.as_str())?;
        property_assignments(
            self.type_id,
            self.entity,
            entries,
            &[],
            WriteOperation::Create,
            translation,
        )
    }
}

pub(crate) fn input_object<'a>(
    argument: &'a Val,
    type_name: &str,
) -> Result<&'a IndexMap<String, Val>, Neo4jExecutionError> {
    match argument {
        Val::Object(entries) => Ok(entries),
        _ => Err(Neo4jExecutionError::Validation(
            type_name.to_string(),
            format!("Expected an input object, got {}", argument.kind()),
        )),
    }
}

/// Assignments for the property entries of `input` (relationship entries are left to the
/// nested mutations), followed by the values the server supplies for properties not set
/// explicitly or through `preset`.
pub(crate) fn property_assignments(
    type_id: TypeId,
    entity: &Variable,
    input: &IndexMap<String, Val>,
    preset: &[&str],
    operation: WriteOperation,
    translation: &Translation,
) -> Result<Vec<SetItem>, Neo4jExecutionError> {
    let mut items = vec![];
    for (key, value) in input {
        items.extend(property_assignment(type_id, entity, key, value, translation)?);
    }
    items.extend(generated_assignments(
        type_id,
        entity,
        |name| input.contains_key(name) || preset.contains(&name),
        operation,
        translation,
    )?);
    Ok(items)
}

/// `entity.property = $param` for one input entry. `None` for relationship fields.
pub(crate) fn property_assignment(
    type_id: TypeId,
    entity: &Variable,
    key: &str,
    value: &Val,
    translation: &Translation,
) -> Result<Option<SetItem>, Neo4jExecutionError> {
    let typ = translation.typ(type_id);
    let Some(field) = typ.field(key) else {
        return Err(Neo4jExecutionError::Validation(
            key.to_string(),
            format!("No such field on type {}", typ.name),
        ));
    };

    match &field.kind {
        FieldKind::Property(property) => {
            if property.is_server_generated() || property.populated_by.is_some() {
                return Err(Neo4jExecutionError::Validation(
                    key.to_string(),
                    "The value is generated by the server".to_string(),
                ));
            }
            Ok(Some(SetItem::new(
                entity.property(&property.db_name),
                value_expression(value, &property.scalar, field.typ.list)?,
            )))
        }
        FieldKind::Relationship(_) => Ok(None),
        FieldKind::Cypher(_) | FieldKind::CustomResolver { .. } => Err(
            Neo4jExecutionError::Validation(
                key.to_string(),
                "Computed fields cannot be written".to_string(),
            ),
        ),
    }
}

/// Server-supplied values for the properties `provided` doesn't cover
pub(crate) fn generated_assignments(
    type_id: TypeId,
    entity: &Variable,
    provided: impl Fn(&str) -> bool,
    operation: WriteOperation,
    translation: &Translation,
) -> Result<Vec<SetItem>, Neo4jExecutionError> {
    let mut items = vec![];
    for field in translation.typ(type_id).fields.iter() {
        if provided(&field.name) {
            continue;
        }
        if let Some(property) = field.property() {
            if let Some(value) = generated_value(field, operation, translation)? {
                items.push(SetItem::new(entity.property(&property.db_name), value));
            }
        }
    }
    Ok(items)
}

/// The value written for a property the input leaves out: `randomUUID()` for generated ids,
/// the current time for timestamps, a callback's value, or the declared default
fn generated_value(
    field: &FieldDescriptor,
    operation: WriteOperation,
    translation: &Translation,
) -> Result<Option<Expression>, Neo4jExecutionError> {
    let Some(property) = field.property() else {
        return Ok(None);
    };

    if property.autogenerate && operation == WriteOperation::Create {
        return Ok(Some(Expression::function("randomUUID", vec![])));
    }

    if property.timestamp.contains(&operation) {
        if let Some(function) = property.scalar.temporal_function() {
            return Ok(Some(Expression::function(function, vec![])));
        }
    }

    if let Some(populated_by) = &property.populated_by {
        if populated_by.operations.contains(&operation) {
            let value = translation
                .context
                .callbacks
                .get(&populated_by.callback)
                .ok_or_else(|| Neo4jExecutionError::MissingArgument(populated_by.callback.clone()))?;
            return Ok(Some(value_expression(value, &property.scalar, field.typ.list)?));
        }
    }

    match &property.default {
        Some(default) if operation == WriteOperation::Create => Ok(Some(value_expression(
            default,
            &property.scalar,
            field.typ.list,
        )?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use exo_cypher::{Clause, ExpressionBuilder, assert_binding};
    use serde_json::json;

    use super::*;
    use crate::{
        context::TranslationContext,
        test_utils::{MOVIES, TestContext},
    };

    const TICKETS: &str = r#"
        type Ticket {
            id: ID! @id
            status: String! @default(value: "open")
            slug: String! @populatedBy(callback: "slug", operations: [CREATE, UPDATE])
            updatedAt: DateTime @timestamp(operations: [UPDATE])
            title: String!
        }
    "#;

    #[test]
    fn generated_values() {
        let context = TestContext::new(MOVIES);
        let translation = context.translation();
        let node = Variable::new("this0");
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        let items = CreateInput {
            type_id: movie,
            entity: &node,
        }
        .to_cypher(
            &Val::from(json!({ "title": "The Matrix", "year": 1999, "tags": ["sci-fi"] })),
            &translation,
        )
        .unwrap();

        assert_binding!(
            Clause::Set(items).to_cypher(),
            "SET this0.title = $param0, this0.released = $param1, this0.tags = $param2, this0.id = randomUUID(), this0.createdAt = datetime()",
            "param0" => "The Matrix",
            "param1" => 1999,
            "param2" => vec!["sci-fi"]
        );
    }

    #[test]
    fn callbacks_and_defaults() {
        let mut context = TestContext::new(TICKETS);
        context.context = TranslationContext::default().with_callback("slug", Val::from(json!("t-1")));
        let translation = context.translation();
        let node = Variable::new("this0");
        let (ticket, _) = context.schema.get_type("Ticket").unwrap();
        let input = Val::from(json!({ "title": "Broken" }));

        let created = property_assignments(
            ticket,
            &node,
            input.as_object().unwrap(),
            &[],
            WriteOperation::Create,
            &translation,
        )
        .unwrap();
        assert_binding!(
            Clause::Set(created).to_cypher(),
            "SET this0.title = $param0, this0.id = randomUUID(), this0.status = $param1, this0.slug = $param2",
            "param0" => "Broken",
            "param1" => "open",
            "param2" => "t-1"
        );

        let updated = property_assignments(
            ticket,
            &node,
            input.as_object().unwrap(),
            &[],
            WriteOperation::Update,
            &translation,
        )
        .unwrap();
        assert_binding!(
            Clause::Set(updated).to_cypher(),
            "SET this0.title = $param0, this0.slug = $param1, this0.updatedAt = datetime()",
            "param0" => "Broken",
            "param1" => "t-1"
        );
    }

    #[test]
    fn invalid_inputs() {
        let context = TestContext::new(TICKETS);
        let translation = context.translation();
        let node = Variable::new("this0");
        let (ticket, _) = context.schema.get_type("Ticket").unwrap();

        let create = |input: serde_json::Value| {
            CreateInput {
                type_id: ticket,
                entity: &node,
            }
            .to_cypher(&Val::from(input), &translation)
        };

        // No callback value supplied
        assert!(matches!(
            create(json!({ "title": "x" })),
            Err(Neo4jExecutionError::MissingArgument(name)) if name == "slug"
        ));
        assert!(matches!(
            create(json!({ "id": "1", "title": "x" })),
            Err(Neo4jExecutionError::Validation(field, _)) if field == "id"
        ));
        assert!(matches!(
            create(json!({ "priority": 1 })),
            Err(Neo4jExecutionError::Validation(field, _)) if field == "priority"
        ));
    }
}
