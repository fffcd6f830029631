// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;
use exo_cypher::{BinaryOperator, Expression, SetItem, Variable};
use neo4j_model::types::{FieldDescriptor, PropertyField, TypeId, WriteOperation};

use crate::{
    cast::value_expression,
    create_data_mapper::{generated_assignments, input_object, property_assignment},
    cypher_mapper::CypherMapper,
    neo4j_execution_error::Neo4jExecutionError,
    translation::Translation,
};

/// The `update` input of a node type (or the `edge` of a relationship update): plain
/// assignments plus `<field>_<OPERATOR>` entries computed from the current value
pub(crate) struct UpdateInput<'a> {
    pub type_id: TypeId,
    pub entity: &'a Variable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UpdateOperator {
    Increment,
    Decrement,
    Add,
    Subtract,
    Multiply,
    Divide,
    Push,
    Pop,
}

const OPERATORS: [(&str, UpdateOperator); 8] = [
    ("_INCREMENT", UpdateOperator::Increment),
    ("_DECREMENT", UpdateOperator::Decrement),
    ("_ADD", UpdateOperator::Add),
    ("_SUBTRACT", UpdateOperator::Subtract),
    ("_MULTIPLY", UpdateOperator::Multiply),
    ("_DIVIDE", UpdateOperator::Divide),
    ("_PUSH", UpdateOperator::Push),
    ("_POP", UpdateOperator::Pop),
];

impl<'a> CypherMapper<'a, Vec<SetItem>> for UpdateInput<'_> {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<Vec<SetItem>, Neo4jExecutionError> {
        let typ = translation.typ(self.type_id);
        let entries = input_object(argument, &typ.name)?;

        let mut items = vec![];
        let mut written: Vec<&str> = vec![];
        for (key, value) in entries {
            if typ.field(key).is_some() {
                if written.contains(&key.as_str()) {
                    return Err(conflicting_updates(key, key));
                }
                items.extend(property_assignment(
                    self.type_id,
                    self.entity,
                    key,
                    value,
                    translation,
                )?);
                written.push(key);
                continue;
            }

            let Some((field_name, operator)) = OPERATORS.iter().find_map(|(suffix, operator)| {
                key.strip_suffix(suffix).map(|field_name| (field_name, *operator))
            }) else {
                return Err(Neo4jExecutionError::Validation(
                    key.clone(),
                    format!("No such field on type {}", typ.name),
                ));
            };

            let field = typ.field(field_name).ok_or_else(|| {
                Neo4jExecutionError::Validation(
                    key.clone(),
                    format!("No such field on type {}", typ.name),
                )
            })?;
            if written.contains(&field_name) {
                return Err(conflicting_updates(key, field_name));
            }
            written.push(field_name);

            items.extend(operator_assignment(
                key, field, operator, value, self.entity,
            )?);
        }

        items.extend(generated_assignments(
            self.type_id,
            self.entity,
            |name| written.contains(&name),
            WriteOperation::Update,
            translation,
        )?);

        Ok(items)
    }
}

fn conflicting_updates(key: &str, field_name: &str) -> Neo4jExecutionError {
    Neo4jExecutionError::Validation(
        key.to_string(),
        format!("Conflicting updates to {field_name}"),
    )
}

/// `None` when the operator leaves the value as it is (popping no elements)
fn operator_assignment(
    key: &str,
    field: &FieldDescriptor,
    operator: UpdateOperator,
    value: &Val,
    entity: &Variable,
) -> Result<Option<SetItem>, Neo4jExecutionError> {
    let invalid = |message: &str| Neo4jExecutionError::Validation(key.to_string(), message.to_string());

    let Some(property) = field.property() else {
        return Err(invalid("Only properties support update operators"));
    };
    if property.is_server_generated() || property.populated_by.is_some() {
        return Err(invalid("The value is generated by the server"));
    }

    let applicable = match operator {
        UpdateOperator::Increment | UpdateOperator::Decrement => {
            !field.typ.list && property.scalar.is_integer()
        }
        UpdateOperator::Add
        | UpdateOperator::Subtract
        | UpdateOperator::Multiply
        | UpdateOperator::Divide => {
            !field.typ.list && property.scalar.is_numeric() && !property.scalar.is_integer()
        }
        UpdateOperator::Push | UpdateOperator::Pop => field.typ.list,
    };
    if !applicable {
        return Err(invalid(&format!(
            "The operator does not apply to a field of type {}",
            field.typ.type_name
        )));
    }
    if value.is_null() {
        return Err(invalid("The operand may not be null"));
    }

    let current = entity.property(&property.db_name);
    Ok(operator_expression(key, current.clone(), operator, value, property)?
        .map(|expression| SetItem::new(current, expression)))
}

/// `this.count + $param0`, `this.tags + $param0`, `this.tags[0..-$param0]`, ...
fn operator_expression(
    key: &str,
    current: Expression,
    operator: UpdateOperator,
    value: &Val,
    property: &PropertyField,
) -> Result<Option<Expression>, Neo4jExecutionError> {
    let arithmetic = |op: BinaryOperator| -> Result<Option<Expression>, Neo4jExecutionError> {
        Ok(Some(current.clone().binary(
            op,
            value_expression(value, &property.scalar, false)?,
        )))
    };

    match operator {
        UpdateOperator::Increment | UpdateOperator::Add => arithmetic(BinaryOperator::Add),
        UpdateOperator::Decrement | UpdateOperator::Subtract => {
            arithmetic(BinaryOperator::Subtract)
        }
        UpdateOperator::Multiply => arithmetic(BinaryOperator::Multiply),
        UpdateOperator::Divide => arithmetic(BinaryOperator::Divide),
        // A single element or a list of them
        UpdateOperator::Push => Ok(Some(current.clone().binary(
            BinaryOperator::Add,
            value_expression(value, &property.scalar, matches!(value, Val::List(_)))?,
        ))),
        UpdateOperator::Pop => {
            let count = value.as_i64().ok_or_else(|| {
                Neo4jExecutionError::Validation(
                    key.to_string(),
                    format!("Expected an integer, got {}", value.kind()),
                )
            })?;
            match count {
                count if count < 0 => Err(Neo4jExecutionError::Validation(
                    key.to_string(),
                    "Can't pop a negative number of elements".to_string(),
                )),
                0 => Ok(None),
                count => Ok(Some(Expression::Slice {
                    list: Box::new(current),
                    from: Some(Box::new(Expression::integer(0))),
                    to: Some(Box::new(Expression::Negate(Box::new(Expression::param(count))))),
                })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use exo_cypher::{Clause, ExpressionBuilder, assert_binding};
    use serde_json::json;

    use super::*;
    use crate::test_utils::TestContext;

    const COUNTERS: &str = r#"
        type Post {
            title: String!
            views: Int!
            score: Float
            tags: [String!]
            updatedAt: DateTime @timestamp(operations: [UPDATE])
        }
    "#;

    fn update(context: &TestContext, input: serde_json::Value) -> Result<Vec<SetItem>, Neo4jExecutionError> {
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (post, _) = context.schema.get_type("Post").unwrap();
        let input = Val::from(input);
        UpdateInput {
            type_id: post,
            entity: &this,
        }
        .to_cypher(&input, &translation)
    }

    #[test]
    fn operators() {
        let context = TestContext::new(COUNTERS);

        assert_binding!(
            Clause::Set(
                update(
                    &context,
                    json!({ "title": "New", "views_INCREMENT": 1, "score_MULTIPLY": 1.5, "tags_PUSH": "rust" })
                )
                .unwrap()
            )
            .to_cypher(),
            "SET this.title = $param0, this.views = this.views + $param1, this.score = this.score * $param2, this.tags = this.tags + $param3, this.updatedAt = datetime()",
            "param0" => "New",
            "param1" => 1,
            "param2" => 1.5,
            "param3" => "rust"
        );

        assert_binding!(
            Clause::Set(update(&context, json!({ "tags_POP": 1, "views_DECREMENT": 2 })).unwrap()).to_cypher(),
            "SET this.tags = this.tags[0..-$param0], this.views = this.views - $param1, this.updatedAt = datetime()",
            "param0" => 1,
            "param1" => 2
        );
    }

    #[test]
    fn list_operators() {
        let context = TestContext::new(COUNTERS);

        // A list operand is appended element-wise
        assert_binding!(
            Clause::Set(update(&context, json!({ "tags_PUSH": ["a", "b"] })).unwrap()).to_cypher(),
            "SET this.tags = this.tags + $param0, this.updatedAt = datetime()",
            "param0" => vec!["a", "b"]
        );

        // Popping nothing leaves the list alone
        assert_binding!(
            Clause::Set(update(&context, json!({ "tags_POP": 0, "views": 3 })).unwrap()).to_cypher(),
            "SET this.views = $param0, this.updatedAt = datetime()",
            "param0" => 3
        );
    }

    #[test]
    fn inapplicable_operators() {
        let context = TestContext::new(COUNTERS);

        for input in [
            json!({ "title_INCREMENT": 1 }),
            json!({ "views_ADD": 1.0 }),
            json!({ "score_PUSH": 1.0 }),
            json!({ "views": 1, "views_INCREMENT": 1 }),
            json!({ "views_INCREMENT": 1, "views": 5 }),
            json!({ "tags_POP": -1 }),
            json!({ "tags_POP": "one" }),
            json!({ "updatedAt_ADD": 1 }),
            json!({ "rating_INCREMENT": 1 }),
        ] {
            assert!(
                matches!(update(&context, input.clone()), Err(Neo4jExecutionError::Validation(..))),
                "{input}"
            );
        }
    }
}
