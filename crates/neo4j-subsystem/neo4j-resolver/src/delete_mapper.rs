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
use exo_cypher::{Clause, Expression, Predicate, Projection, Variable};
use neo4j_model::{
    access::{AuthOperation, ValidationTiming},
    relationship::NestedOperation,
};

use crate::{
    access::{check_authentication, filter_rules, validation_clause},
    neo4j_execution_error::Neo4jExecutionError,
    relationship_mapper::{Parent, Related, count_result, operation_argument},
    translation::Translation,
};

/// `delete: { where: { node, edge }, delete }`
///
/// Nested deletes run first, while the related node is still bound. The matched nodes are
/// collected once so a node reached through several rows is deleted a single time.
///
/// ```cypher
/// WITH *
/// CALL {
///     WITH this
///     OPTIONAL MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)
///     WHERE this1.name = $param0
///     WITH collect(DISTINCT this1) AS var2
///     UNWIND var2 AS this1
///     DETACH DELETE this1
///     RETURN count(*) AS var3
/// }
/// ```
pub(crate) fn delete_related(
    related: Related,
    item: &IndexMap<String, Val>,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    check_authentication(related.target, AuthOperation::Delete, translation)?;

    let node = translation.scope.fresh_node();
    let edge = translation.scope.fresh_node();

    let (pattern, labels) = related.pattern(Some(&edge), &node, translation);
    let filter = related.connection_where(item, &node, &edge, translation)?;
    let auth = filter_rules(
        related.target,
        &[],
        AuthOperation::Delete,
        &node,
        translation,
    )?;

    let mut body = vec![Clause::optional_matching(
        pattern,
        Predicate::and_all([labels, filter, auth]),
    )];
    body.extend(validation_clause(
        &[(related.target, &node)],
        AuthOperation::Delete,
        ValidationTiming::Before,
        translation,
    )?);

    if let Some(nested) = item.get("delete").filter(|value| !value.is_null()) {
        body.extend(nested_deletes(
            Parent {
                node: &node,
                type_id: related.target,
            },
            nested,
            translation,
            related.depth,
        )?);
    }

    let list = translation.scope.fresh_var();
    let result = translation.scope.fresh_var();
    body.extend(batched_delete(&node, &list));
    body.push(count_result(&result));

    Ok(related.subquery(body))
}

/// The `delete` argument of a node: `{ actors: [{ where, delete }] }`
pub(crate) fn nested_deletes(
    parent: Parent,
    argument: &Val,
    translation: &Translation,
    depth: usize,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    Ok(operation_argument(NestedOperation::Delete, parent, argument, translation, depth)?.clauses)
}

/// `WITH collect(DISTINCT n) AS list UNWIND list AS n DETACH DELETE n`
fn batched_delete(node: &Variable, list: &Variable) -> [Clause; 3] {
    [
        Clause::With(Projection::single(
            Expression::distinct_function("collect", vec![node.expr()]),
            list,
        )),
        Clause::Unwind {
            list: list.expr(),
            alias: node.clone(),
        },
        Clause::Delete {
            detach: true,
            items: vec![node.expr()],
        },
    ]
}
