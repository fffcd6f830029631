// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Root mutations: `create<Plural>`, `update<Plural>` and `delete<Plural>`.
//!
//! Created and updated nodes are projected with the selection under the `<plural>` key of the
//! response into a single `data` column. The counters under `info` come from the execution
//! summary, not from the statement.

use common::value::Val;
use core_resolver::validation::field::ValidatedField;
use exo_cypher::{Clause, Expression, Pattern, Predicate, Projection, Query, Variable};
use neo4j_model::{
    access::{AuthOperation, ValidationTiming},
    relationship::NestedOperation,
    types::{FieldDescriptor, TypeId, WriteOperation},
};

use crate::{
    access::{check_authentication, filter_rules, validation_clause},
    cardinality::cardinality_checks,
    create_data_mapper::{input_object, property_assignments},
    cypher_mapper::CypherMapper,
    delete_mapper::nested_deletes,
    neo4j_execution_error::Neo4jExecutionError,
    predicate_mapper::WhereInput,
    projection::project_node,
    relationship_mapper::{
        NestedMutations, Parent, UPDATE_ORDER, as_items, create_input_relationships,
        operation_argument, update_input_relationships,
    },
    translation::Translation,
    update_data_mapper::UpdateInput,
};

/// Name of the column holding the projected nodes of a create or update
pub const DATA_COLUMN: &str = "data";

/// `create<Plural>(input: [...])`
///
/// ```cypher
/// CALL {
///     CREATE (this0:Movie)
///     SET this0.title = $param0
///     RETURN this0
/// }
/// UNWIND [this0] AS this
/// RETURN collect(this { .title }) AS data
/// ```
pub(crate) fn create_query(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Query, Neo4jExecutionError> {
    check_authentication(type_id, AuthOperation::Create, translation)?;

    let input = field
        .get_argument("input")
        .ok_or_else(|| Neo4jExecutionError::MissingArgument("input".to_string()))?;

    let mut clauses = vec![];
    let mut created = vec![];
    for item in as_items(input) {
        let node = translation.scope.fresh_node();
        clauses.push(Clause::call(create_node(type_id, &node, item, translation)?));
        created.push(node);
    }

    let this = translation.scope.root_variable();
    clauses.push(Clause::Unwind {
        list: Expression::List(created.iter().map(Variable::expr).collect()),
        alias: this.clone(),
    });
    clauses.extend(project_data(type_id, &this, field, false, translation)?);

    Ok(Query::Single(clauses))
}

fn create_node(
    type_id: TypeId,
    node: &Variable,
    input: &Val,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let input = input_object(input, &translation.typ(type_id).name)?;

    let mut clauses = vec![Clause::Create(Pattern::node(
        translation.node_pattern(type_id, node),
    ))];
    let assignments = property_assignments(
        type_id,
        node,
        input,
        &[],
        WriteOperation::Create,
        translation,
    )?;
    if !assignments.is_empty() {
        clauses.push(Clause::Set(assignments));
    }

    let nested = create_input_relationships(
        Parent {
            node,
            type_id,
        },
        input,
        translation,
        0,
    )?;
    clauses.extend(nested.clauses);

    clauses.extend(validation_clause(
        &[(type_id, node)],
        AuthOperation::Create,
        ValidationTiming::After,
        translation,
    )?);
    clauses.extend(cardinality_checks(
        node,
        type_id,
        &nested.touched,
        true,
        translation,
    ));
    clauses.push(Clause::Return(Projection::variables(&[node])));

    Ok(clauses)
}

/// `update<Plural>(where:, update:, connect:, disconnect:, create:, delete:, connectOrCreate:)`
pub(crate) fn update_query(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Query, Neo4jExecutionError> {
    check_authentication(type_id, AuthOperation::Update, translation)?;

    let this = translation.scope.root_variable();
    let update = field.get_argument("update");

    let written = match update {
        Some(update) => written_fields(type_id, input_object(update, "update")?.keys(), translation),
        None => vec![],
    };
    let predicate = Predicate::and(
        root_filter(type_id, field, &this, translation)?,
        filter_rules(type_id, &written, AuthOperation::Update, &this, translation)?,
    );

    let mut clauses = vec![Clause::matching(
        Pattern::node(translation.node_pattern(type_id, &this)),
        predicate,
    )];
    clauses.extend(validation_clause(
        &[(type_id, &this)],
        AuthOperation::Update,
        ValidationTiming::Before,
        translation,
    )?);

    let parent = Parent {
        node: &this,
        type_id,
    };
    let mut mutations = NestedMutations::default();
    if let Some(update) = update {
        let assignments = UpdateInput {
            type_id,
            entity: &this,
        }
        .to_cypher(update, translation)?;
        if !assignments.is_empty() {
            clauses.push(Clause::Set(assignments));
        }
        mutations = update_input_relationships(
            parent,
            input_object(update, "update")?,
            translation,
            0,
        )?;
    }

    for operation in UPDATE_ORDER {
        if operation == NestedOperation::Update {
            continue;
        }
        if let Some(argument) = field.get_argument(operation.input_name()) {
            mutations.append(operation_argument(
                operation,
                parent,
                argument,
                translation,
                0,
            )?);
        }
    }
    clauses.extend(mutations.clauses);

    clauses.extend(validation_clause(
        &[(type_id, &this)],
        AuthOperation::Update,
        ValidationTiming::After,
        translation,
    )?);
    clauses.extend(cardinality_checks(
        &this,
        type_id,
        &mutations.touched,
        false,
        translation,
    ));
    clauses.extend(project_data(type_id, &this, field, true, translation)?);

    Ok(Query::Single(clauses))
}

/// `delete<Plural>(where:, delete:)`
///
/// ```cypher
/// MATCH (this:Movie)
/// WHERE this.title = $param0
/// DETACH DELETE this
/// ```
pub(crate) fn delete_query(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Query, Neo4jExecutionError> {
    check_authentication(type_id, AuthOperation::Delete, translation)?;

    let this = translation.scope.root_variable();
    let predicate = Predicate::and(
        root_filter(type_id, field, &this, translation)?,
        filter_rules(type_id, &[], AuthOperation::Delete, &this, translation)?,
    );

    let mut clauses = vec![Clause::matching(
        Pattern::node(translation.node_pattern(type_id, &this)),
        predicate,
    )];
    clauses.extend(validation_clause(
        &[(type_id, &this)],
        AuthOperation::Delete,
        ValidationTiming::Before,
        translation,
    )?);
    if let Some(nested) = field.get_argument("delete") {
        clauses.extend(nested_deletes(
            Parent {
                node: &this,
                type_id,
            },
            nested,
            translation,
            0,
        )?);
    }
    clauses.push(Clause::Delete {
        detach: true,
        items: vec![this.expr()],
    });

    Ok(Query::Single(clauses))
}

fn root_filter(
    type_id: TypeId,
    field: &ValidatedField,
    this: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    match field.get_argument("where") {
        Some(filter) => WhereInput {
            type_id,
            node: this,
        }
        .to_cypher(filter, translation),
        None => Ok(Predicate::True),
    }
}

/// Fields carrying their own authorization that an input writes, operator suffixes included
fn written_fields<'a, 'k>(
    type_id: TypeId,
    keys: impl Iterator<Item = &'k String>,
    translation: &Translation<'a>,
) -> Vec<&'a FieldDescriptor> {
    let typ = translation.typ(type_id);
    keys.filter_map(|key| {
        typ.fields.iter().find(|field| {
            key == &field.name
                || key
                    .strip_prefix(field.name.as_str())
                    .is_some_and(|suffix| suffix.starts_with('_'))
        })
    })
    .filter(|field| field.authorization.is_some())
    .collect()
}

/// `RETURN collect(this { ... }) AS data` with the selection under `<plural>`
fn project_data(
    type_id: TypeId,
    this: &Variable,
    field: &ValidatedField,
    distinct: bool,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let plural = &translation.typ(type_id).plural;
    let selection = field
        .subfields
        .iter()
        .find(|subfield| subfield.name.as_str() == plural)
        .map(|subfield| subfield.subfields.as_slice())
        .unwrap_or_default();

    let projection = project_node(type_id, this, selection, translation, 0)?;
    let map = projection.map(this);

    let mut clauses = projection.subqueries;
    let collected = if distinct {
        Expression::distinct_function("collect", vec![map])
    } else {
        Expression::function("collect", vec![map])
    };
    clauses.push(Clause::Return(Projection::single(
        collected,
        &Variable::new(DATA_COLUMN),
    )));
    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use exo_cypher::{ExpressionBuilder, assert_binding};

    use super::*;
    use crate::test_utils::{MOVIES, TestContext};

    #[test]
    fn create_with_nested_create() {
        let context = TestContext::new(MOVIES);
        let field = context.selection(
            r#"mutation {
                createMovies(input: [
                    { title: "Speed", actors: { create: [{ node: { name: "Keanu" }, edge: { role: "Jack" } }] } },
                    { title: "Heat" }
                ]) {
                    movies { title actors { name } }
                    info { nodesCreated }
                }
            }"#,
        );
        let translation = context.translation();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        assert_binding!(
            create_query(movie, &field, &translation).unwrap().to_cypher(),
            r#"CALL {
    CREATE (this0:Movie)
    SET this0.title = $param0, this0.id = randomUUID(), this0.createdAt = datetime()
    WITH *
    CREATE (this1:Actor)
    SET this1.name = $param1
    MERGE (this0)<-[this2:ACTED_IN]-(this1)
    SET this2.role = $param2
    RETURN this0
}
CALL {
    CREATE (this3:Movie)
    SET this3.title = $param3, this3.id = randomUUID(), this3.createdAt = datetime()
    RETURN this3
}
UNWIND [this0, this3] AS this
CALL {
    WITH this
    MATCH (this)<-[this4:ACTED_IN]-(this5:Actor)
    WITH this5 { .name } AS this5
    RETURN collect(this5) AS var6
}
RETURN collect(this { .title, actors: var6 }) AS data"#,
            "param0" => "Speed",
            "param1" => "Keanu",
            "param2" => "Jack",
            "param3" => "Heat"
        );
    }

    #[test]
    fn update_with_operators_and_connect() {
        let context = TestContext::new(MOVIES);
        let field = context.selection(
            r#"mutation {
                updateMovies(
                    where: { title: "Speed" },
                    update: { rating: 8.5, tags_PUSH: "action" },
                    connect: { director: { where: { node: { name: "Jan" } } } }
                ) {
                    movies { title }
                }
            }"#,
        );
        let translation = context.translation();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        assert_binding!(
            update_query(movie, &field, &translation).unwrap().to_cypher(),
            r#"MATCH (this:Movie)
WHERE this.title = $param0
SET this.rating = $param1, this.tags = this.tags + $param2
WITH *
CALL {
    WITH this
    OPTIONAL MATCH (this0:Person)
    WHERE this0.name = $param3
    WITH this, collect(this0) AS var2
    UNWIND var2 AS this0
    MERGE (this)<-[this1:DIRECTED]-(this0)
    RETURN count(*) AS var3
}
WITH *
CALL {
    WITH this
    MATCH (this)<-[this4:DIRECTED]-(:Person)
    WITH count(this4) AS var5
    WHERE apoc.util.validatePredicate(NOT (var5 <= 1), "@neo4j/graphql/RELATIONSHIP-REQUIREDMovie.director must be less than or equal to one", [0])
    RETURN var5
}
RETURN collect(DISTINCT this { .title }) AS data"#,
            "param0" => "Speed",
            "param1" => 8.5,
            "param2" => "action",
            "param3" => "Jan"
        );
    }

    #[test]
    fn delete_matching() {
        let context = TestContext::new(MOVIES);
        let field = context.selection(
            r#"mutation { deleteMovies(where: { year_LT: 1950 }) { nodesDeleted } }"#,
        );
        let translation = context.translation();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        assert_binding!(
            delete_query(movie, &field, &translation).unwrap().to_cypher(),
            "MATCH (this:Movie)\nWHERE this.released < $param0\nDETACH DELETE this",
            "param0" => 1950
        );
    }
}
