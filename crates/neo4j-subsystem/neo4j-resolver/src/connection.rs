// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Relay-style connection selections (`actorsConnection { totalCount edges { node properties } }`).
//!
//! Each matched relationship becomes an `edge` map holding the projected relationship properties
//! and target node. Edges are collected, counted, and (when `sort` or `first` is given) ordered
//! and truncated in a subquery over the collected list.

use common::value::Val;
use core_resolver::validation::field::ValidatedField;
use exo_cypher::{Clause, Expression, Predicate, Projection, ProjectionItem, Query, Variable};
use neo4j_model::{
    access::AuthOperation,
    relationship::{RelationshipDescriptor, RelationshipId},
};

use crate::{
    access,
    cypher_mapper::CypherMapper,
    neo4j_execution_error::Neo4jExecutionError,
    order_by_mapper::{ConnectionSide, ConnectionSortInput, SortField, pagination_param},
    predicate_mapper::ConnectionWhereInput,
    projection::{NodeProjection, branches, project_node, selected_fields},
    translation::Translation,
};

pub(crate) fn connection_projection(
    relationship_id: RelationshipId,
    source: &Variable,
    field: &ValidatedField,
    translation: &Translation,
    depth: usize,
) -> Result<(Expression, Clause), Neo4jExecutionError> {
    translation.check_depth(depth + 1, &field.name)?;

    for cursor_argument in ["after", "before", "last"] {
        if field.get_argument(cursor_argument).is_some() {
            return Err(Neo4jExecutionError::Validation(
                cursor_argument.to_string(),
                "Cursor-based pagination is not supported".to_string(),
            ));
        }
    }

    let relationship = translation.relationship(relationship_id);
    let directed = relationship.is_directed(field.get_argument("directed").and_then(Val::as_bool));
    let sort = match field.get_argument("sort") {
        Some(sort) => ConnectionSortInput {
            node_type: relationship.target,
            edge_type: relationship.properties,
        }
        .to_cypher(sort, translation)?,
        None => vec![],
    };
    let first = match field.get_argument("first") {
        Some(first) => pagination_param("first", first, false)?,
        None => None,
    };

    let edges_selection = subselection(&field.subfields, "edges");
    let edge = Variable::new("edge");
    let is_abstract = translation.typ(relationship.target).is_abstract();

    let mut union = vec![];
    for branch in branches(relationship.target, field.get_argument("where"), translation)? {
        let rel = translation.scope.fresh_node();
        let node = translation.scope.fresh_node();
        let pattern = translation.relationship_pattern(
            source,
            relationship,
            Some(&rel),
            translation.node_pattern(branch.type_id, &node),
            directed,
        );

        let node_selection = subselection(&edges_selection, "node");
        access::check_authentication(branch.type_id, AuthOperation::Read, translation)?;
        let user_filter = match branch.filter {
            Some(filter) => ConnectionWhereInput {
                relationship,
                type_id: branch.filter_type,
                node: &node,
                edge: &rel,
            }
            .to_cypher(filter, translation)?,
            None => Predicate::True,
        };
        let auth_filter = access::filter_rules(
            branch.type_id,
            &selected_fields(branch.type_id, &node_selection, translation),
            AuthOperation::Read,
            &node,
            translation,
        )?;

        let mut node_projection =
            project_node(branch.type_id, &node, &node_selection, translation, depth + 1)?;
        node_projection.include_sort_fields(&side_sort(&sort, ConnectionSide::Node), &node)?;
        if is_abstract {
            node_projection.tag(&translation.typ(branch.type_id).name, &node);
        }

        let mut properties_projection = match relationship.properties {
            Some(properties) => project_node(
                properties,
                &rel,
                &subselection(&edges_selection, "properties"),
                translation,
                depth + 1,
            )?,
            None => NodeProjection::default(),
        };
        properties_projection.include_sort_fields(&side_sort(&sort, ConnectionSide::Edge), &rel)?;

        let mut clauses = vec![
            Clause::with_variables(&[source]),
            Clause::matching(pattern, Predicate::and(user_filter, auth_filter)),
        ];
        clauses.extend(std::mem::take(&mut node_projection.subqueries));
        clauses.extend(std::mem::take(&mut properties_projection.subqueries));
        let edge_map = edge_map(
            relationship,
            &edges_selection,
            &sort,
            node_projection.map(&node),
            properties_projection.map(&rel),
            translation,
        )?;
        clauses.push(Clause::With(Projection::single(edge_map, &edge)));
        union.push(clauses);
    }

    let mut clauses = if is_abstract {
        let union = union
            .into_iter()
            .map(|mut clauses| {
                clauses.push(Clause::Return(Projection::variables(&[&edge])));
                clauses
            })
            .collect();
        vec![
            Clause::with_variables(&[source]),
            Clause::Call(Box::new(Query::union(union))),
        ]
    } else {
        union.into_iter().flatten().collect()
    };

    let edges = Variable::new("edges");
    let total_count = Variable::new("totalCount");
    clauses.push(Clause::With(Projection::single(
        Expression::function("collect", vec![edge.expr()]),
        &edges,
    )));
    clauses.push(Clause::With(Projection::items(vec![
        ProjectionItem::plain(&edges),
        ProjectionItem::aliased(
            Expression::function("size", vec![edges.expr()]),
            &total_count,
        ),
    ])));

    let mut edges_value = edges.expr();
    if !sort.is_empty() || first.is_some() {
        let paged = translation.scope.fresh_var();
        let mut ordered = Projection::variables(&[&edge]);
        ordered.order_by = sort
            .iter()
            .map(|(side, field)| field.on_projection(edge.expr().property(side.key())))
            .collect();
        ordered.limit = first;
        clauses.push(Clause::call(vec![
            Clause::with_variables(&[&edges]),
            Clause::Unwind {
                list: edges.expr(),
                alias: edge.clone(),
            },
            Clause::With(ordered),
            Clause::Return(Projection::single(
                Expression::function("collect", vec![edge.expr()]),
                &paged,
            )),
        ]));
        edges_value = paged.expr();
    }

    let mut entries = vec![];
    for selected in &field.subfields {
        let value = match selected.name.as_str() {
            "totalCount" => total_count.expr(),
            "edges" => edges_value.clone(),
            "__typename" => Expression::string(format!(
                "{}{}Connection",
                translation.typ(relationship.owner).name,
                upper_first(&relationship.field_name)
            )),
            _ => {
                return Err(Neo4jExecutionError::Validation(
                    selected.name.to_string(),
                    "Unsupported connection field".to_string(),
                ));
            }
        };
        entries.push((selected.output_name(), value));
    }

    let result = translation.scope.fresh_var();
    clauses.push(Clause::Return(Projection::single(
        Expression::Map(entries),
        &result,
    )));

    Ok((result.expr(), Clause::call(clauses)))
}

/// `{ node: ..., properties: ... }` under the selected (possibly aliased) keys. Sorting looks values
/// up under the canonical keys, so those are added when the selection doesn't provide them.
fn edge_map(
    relationship: &RelationshipDescriptor,
    selection: &[ValidatedField],
    sort: &[(ConnectionSide, SortField)],
    node: Expression,
    properties: Expression,
    translation: &Translation,
) -> Result<Expression, Neo4jExecutionError> {
    let mut entries: Vec<(String, Expression)> = vec![];
    for field in selection {
        let value = match field.name.as_str() {
            "node" => node.clone(),
            "properties" if relationship.properties.is_some() => properties.clone(),
            "__typename" => Expression::string(format!(
                "{}{}Relationship",
                translation.typ(relationship.owner).name,
                upper_first(&relationship.field_name)
            )),
            _ => {
                return Err(Neo4jExecutionError::Validation(
                    field.name.to_string(),
                    "Unsupported connection edge field".to_string(),
                ));
            }
        };
        entries.push((field.output_name(), value));
    }

    for (side, _) in sort {
        if !entries.iter().any(|(key, _)| key == side.key()) {
            let value = match side {
                ConnectionSide::Node => node.clone(),
                ConnectionSide::Edge => properties.clone(),
            };
            entries.push((side.key().to_string(), value));
        }
    }

    Ok(Expression::Map(entries))
}

fn side_sort(sort: &[(ConnectionSide, SortField)], side: ConnectionSide) -> Vec<SortField> {
    sort.iter()
        .filter(|(field_side, _)| *field_side == side)
        .map(|(_, field)| field.clone())
        .collect()
}

/// The subfields of every selected field with the given name
fn subselection(selection: &[ValidatedField], name: &str) -> Vec<ValidatedField> {
    selection
        .iter()
        .filter(|field| field.name.as_str() == name)
        .flat_map(|field| field.subfields.iter().cloned())
        .collect()
}

pub(crate) fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
