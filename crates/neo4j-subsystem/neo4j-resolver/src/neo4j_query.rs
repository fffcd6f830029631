// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use core_resolver::validation::field::ValidatedField;
use exo_cypher::{Clause, Pattern, Projection, Query};
use neo4j_model::{access::AuthOperation, types::TypeId};

use crate::{
    aggregate::root_aggregate,
    neo4j_execution_error::Neo4jExecutionError,
    projection::{branches, options, project_node, read_predicate},
    translation::Translation,
};

/// `<plural>(where:, options:)`
///
/// A node type is matched directly. Interfaces and unions read each concrete type in a branch of
/// a `UNION` subquery, and the combined rows are ordered and paginated afterwards.
pub(crate) fn read_query(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Query, Neo4jExecutionError> {
    if translation.typ(type_id).is_abstract() {
        abstract_read_query(type_id, field, translation)
    } else {
        node_read_query(type_id, field, translation)
    }
}

/// `<plural>Aggregate(where:)`
pub(crate) fn aggregate_query(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Query, Neo4jExecutionError> {
    Ok(Query::Single(root_aggregate(type_id, field, translation)?))
}

fn node_read_query(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Query, Neo4jExecutionError> {
    let this = translation.scope.root_variable();

    let predicate = read_predicate(
        type_id,
        type_id,
        field.get_argument("where"),
        &field.subfields,
        AuthOperation::Read,
        &this,
        translation,
    )?;
    let options = options(field, type_id, translation)?;
    let projection = project_node(type_id, &this, &field.subfields, translation, 0)?;

    let mut clauses = vec![Clause::matching(
        Pattern::node(translation.node_pattern(type_id, &this)),
        predicate,
    )];
    if let Some(pagination) = options.node_clause(&this)? {
        clauses.push(Clause::With(pagination));
    }
    let map = projection.map(&this);
    clauses.extend(projection.subqueries);
    clauses.push(Clause::Return(Projection::single(map, &this)));

    Ok(Query::Single(clauses))
}

fn abstract_read_query(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Query, Neo4jExecutionError> {
    let this = translation.scope.root_variable();
    let options = options(field, type_id, translation)?;

    let mut union = vec![];
    for branch in branches(type_id, field.get_argument("where"), translation)? {
        let node = translation.scope.fresh_node();
        let predicate = read_predicate(
            branch.filter_type,
            branch.type_id,
            branch.filter,
            &field.subfields,
            AuthOperation::Read,
            &node,
            translation,
        )?;

        let mut projection = project_node(branch.type_id, &node, &field.subfields, translation, 0)?;
        projection.include_sort_fields(&options.sort, &node)?;
        projection.tag(&translation.typ(branch.type_id).name, &node);

        let mut clauses = vec![Clause::matching(
            Pattern::node(translation.node_pattern(branch.type_id, &node)),
            predicate,
        )];
        let map = projection.map(&node);
        clauses.extend(projection.subqueries);
        clauses.push(Clause::With(Projection::single(map, &this)));
        clauses.push(Clause::Return(Projection::variables(&[&this])));
        union.push(clauses);
    }

    let mut clauses = vec![Clause::Call(Box::new(Query::union(union)))];
    if !options.is_empty() {
        let mut ordered = Projection::variables(&[&this]);
        options.apply_to_projection(&mut ordered, &this);
        clauses.push(Clause::With(ordered));
    }
    clauses.push(Clause::Return(Projection::variables(&[&this])));

    Ok(Query::Single(clauses))
}
