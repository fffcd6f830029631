// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! `@cypher` fields: the author's statement runs in a nested subquery with `this` bound to the
//! parent node, and its `columnName` column is collected into the field's value.

use indexmap::IndexMap;

use common::value::Val;
use core_resolver::validation::field::ValidatedField;
use exo_cypher::{
    Clause, CypherValue, Expression, Param, Predicate, Projection, Template, TemplateError,
    Variable,
};
use neo4j_model::{
    access::AuthOperation,
    types::{CypherField, CypherReturnType, FieldDescriptor},
};

use crate::{
    access,
    cast::{cast_value, val_to_cypher},
    neo4j_execution_error::Neo4jExecutionError,
    projection::{project_node, selected_fields},
    translation::Translation,
};

/// `CALL { WITH source CALL { <statement> } UNWIND column AS x RETURN collect(x) AS varN }`
pub(crate) fn project(
    descriptor: &FieldDescriptor,
    cypher: &CypherField,
    source: &Variable,
    field: &ValidatedField,
    translation: &Translation,
    depth: usize,
) -> Result<(Expression, Clause), Neo4jExecutionError> {
    translation.check_depth(depth + 1, &field.name)?;

    let statement = statement_template(cypher, field, translation)?;

    // The statement refers to the parent as `this`
    let this = Variable::new("this");
    let mut inner = vec![Clause::with_variables(&[source])];
    if *source != this {
        inner.push(Clause::With(Projection::single(source.expr(), &this)));
    }
    inner.push(Clause::Raw(statement));

    let value = translation.scope.fresh_node();
    let mut clauses = vec![
        Clause::with_variables(&[source]),
        Clause::call(inner),
        Clause::Unwind {
            list: Variable::new(&cypher.column_name).expr(),
            alias: value.clone(),
        },
    ];

    if let CypherReturnType::Composite(type_id) = cypher.return_type {
        let typ = translation.typ(type_id);
        if typ.is_abstract() {
            return Err(Neo4jExecutionError::Validation(
                field.name.to_string(),
                format!("@cypher fields returning {} are not supported", typ.name),
            ));
        }

        access::check_authentication(type_id, AuthOperation::Read, translation)?;
        let auth_filter = access::filter_rules(
            type_id,
            &selected_fields(type_id, &field.subfields, translation),
            AuthOperation::Read,
            &value,
            translation,
        )?;
        if auth_filter != Predicate::True {
            clauses.push(Clause::filter(auth_filter));
        }

        let projection = project_node(type_id, &value, &field.subfields, translation, depth + 1)?;
        let map = projection.map(&value);
        clauses.extend(projection.subqueries);
        clauses.push(Clause::With(Projection::single(map, &value)));
    }

    let collected = Expression::function("collect", vec![value.expr()]);
    let collected = if descriptor.typ.list {
        collected
    } else {
        Expression::function("head", vec![collected])
    };
    let result = translation.scope.fresh_var();
    clauses.push(Clause::Return(Projection::single(collected, &result)));

    Ok((result.expr(), Clause::call(clauses)))
}

/// The statement with `$name` references bound to the field's arguments (cast by their declared
/// type) or to the caller's claims (`$jwt`). Repeated references share one parameter.
fn statement_template(
    cypher: &CypherField,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Template, Neo4jExecutionError> {
    let mut bound: IndexMap<String, Param> = IndexMap::new();

    Template::parse(&cypher.statement, |name| {
        if let Some(param) = bound.get(name) {
            return Ok(param.clone());
        }

        let param = if name == "jwt" {
            match translation.jwt_param()? {
                Some(param) => param,
                None => Param::named("jwt", CypherValue::Null),
            }
        } else {
            let argument = cypher
                .arguments
                .iter()
                .find(|argument| argument.name == name)
                .ok_or_else(|| {
                    Neo4jExecutionError::Generic(
                        TemplateError::UnknownParameter(name.to_string()).to_string(),
                    )
                })?;
            let value = field.arguments.get(name).unwrap_or(&Val::Null);
            let value = match &argument.scalar {
                Some(scalar) => cast_value(value, scalar)?,
                None => val_to_cypher(value)?,
            };
            Param::new(value)
        };

        bound.insert(name.to_string(), param.clone());
        Ok(param)
    })
}

#[cfg(test)]
mod tests {
    use exo_cypher::{ExpressionBuilder, Query, assert_binding};
    use neo4j_model::types::FieldKind;
    use serde_json::json;

    use super::*;
    use crate::test_utils::{MOVIES, TestContext};

    fn cypher_field<'a>(context: &'a TestContext, type_name: &str, field_name: &str) -> (&'a FieldDescriptor, &'a CypherField) {
        let (_, typ) = context.schema.get_type(type_name).unwrap();
        let descriptor = typ.field(field_name).unwrap();
        let FieldKind::Cypher(cypher) = &descriptor.kind else {
            panic!("Expected a cypher field");
        };
        (descriptor, cypher)
    }

    #[test]
    fn scalar_field() {
        let context = TestContext::new(MOVIES);
        let field = context.selection("{ movies { actorCount } }");
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        let projection = project_node(movie, &this, &field.subfields, &translation, 0).unwrap();
        assert_eq!(
            projection.map(&this).to_cypher().cypher,
            "this { actorCount: var1 }"
        );
        assert_eq!(
            Query::Single(projection.subqueries).to_cypher().cypher,
            "CALL {\n    WITH this\n    CALL {\n        WITH this\n        MATCH (this)<-[:ACTED_IN]-(a) RETURN count(a) AS c\n    }\n    UNWIND c AS this0\n    RETURN head(collect(this0)) AS var1\n}"
        );
    }

    #[test]
    fn composite_field_with_arguments() {
        let context = TestContext::new(MOVIES);
        let field = context.selection("{ movies { similar(limit: 3) { title } } }");
        let translation = context.translation();
        let (descriptor, cypher) = cypher_field(&context, "Movie", "similar");

        // A nested parent is rebound to `this` for the statement
        let source = Variable::new("this4");
        let (value, subquery) =
            project(descriptor, cypher, &source, &field.subfields[0], &translation, 0).unwrap();

        assert_eq!(value.to_cypher().cypher, "var1");
        assert_binding!(
            subquery.to_cypher(),
            "CALL {\n    WITH this4\n    CALL {\n        WITH this4\n        WITH this4 AS this\n        MATCH (this)--(m:Movie) RETURN m LIMIT $param0\n    }\n    UNWIND m AS this0\n    WITH this0 { .title } AS this0\n    RETURN collect(this0) AS var1\n}",
            "param0" => 3
        );
    }

    const OWNED: &str = r#"
        type Movie {
            title: String!
            mine(min: Int): Int @cypher(statement: "MATCH (this)<-[:OWNS]-(u {id: $jwt.sub}) WHERE this.year > $min OR this.rating > $min RETURN count(u) AS c", columnName: "c")
        }
    "#;

    #[test]
    fn statement_parameters() {
        let context = TestContext::new(OWNED).with_claims(json!({ "sub": "u1" }));
        let field = context.selection("{ movies { mine(min: 5) } }");
        let translation = context.translation();
        let (_, cypher) = cypher_field(&context, "Movie", "mine");

        assert_binding!(
            Clause::Raw(statement_template(cypher, &field.subfields[0], &translation).unwrap()).to_cypher(),
            "MATCH (this)<-[:OWNS]-(u {id: $jwt.sub}) WHERE this.year > $param0 OR this.rating > $param0 RETURN count(u) AS c",
            "jwt" => CypherValue::Map([("sub".to_string(), CypherValue::from("u1"))].into_iter().collect()),
            "param0" => 5
        );

        // Without claims `$jwt` is null, and a missing argument binds null
        let anonymous = TestContext::new(OWNED);
        let field = anonymous.selection("{ movies { mine } }");
        let translation = anonymous.translation();
        let (_, cypher) = cypher_field(&anonymous, "Movie", "mine");
        assert_binding!(
            Clause::Raw(statement_template(cypher, &field.subfields[0], &translation).unwrap()).to_cypher(),
            "MATCH (this)<-[:OWNS]-(u {id: $jwt.sub}) WHERE this.year > $param0 OR this.rating > $param0 RETURN count(u) AS c",
            "jwt" => CypherValue::Null,
            "param0" => CypherValue::Null
        );

        let mut unknown = cypher.clone();
        unknown.statement = "RETURN $other AS c".to_string();
        assert!(matches!(
            statement_template(&unknown, &field.subfields[0], &translation),
            Err(Neo4jExecutionError::Generic(_))
        ));
    }
}
