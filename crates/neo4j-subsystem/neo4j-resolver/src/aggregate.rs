// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Aggregation selections: `moviesAggregate { count title { longest } }` at the root and
//! `actorsAggregate { count node { born { max } } edge { role { shortest } } }` on relationships.
//!
//! Every requested value is computed in its own `CALL` subquery over the same match, and the
//! results are assembled into a map.

use common::value::Val;
use core_resolver::validation::field::ValidatedField;
use exo_cypher::{
    Clause, Expression, Pattern, Predicate, Projection, SortDirection, SortItem, Variable,
};
use neo4j_model::{access::AuthOperation, relationship::RelationshipId, types::TypeId};

use crate::{
    connection::upper_first,
    cypher_mapper::CypherMapper,
    neo4j_execution_error::Neo4jExecutionError,
    predicate_mapper::WhereInput,
    projection::{read_predicate, selected_fields, temporal_output},
    translation::Translation,
};

/// What is being aggregated: the matched nodes and, on a relationship, the matched edges
struct AggregateSource {
    import: Option<Variable>,
    pattern: Pattern,
    predicate: Predicate,
    node: Variable,
    node_type: TypeId,
    edge: Option<(Variable, TypeId)>,
}

impl AggregateSource {
    fn matching(&self) -> Vec<Clause> {
        let mut clauses = vec![];
        if let Some(import) = &self.import {
            clauses.push(Clause::with_variables(&[import]));
        }
        clauses.push(Clause::matching(
            self.pattern.clone(),
            self.predicate.clone(),
        ));
        clauses
    }
}

/// `<plural>Aggregate(where:)` as the clauses of a complete statement returning `this`
pub(crate) fn root_aggregate(
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    crate::access::check_authentication(type_id, AuthOperation::Aggregate, translation)?;

    let node = translation.scope.root_variable();
    let (node_pattern, label_predicate) = translation.target_node(type_id, &node);

    let user_filter = match field.get_argument("where") {
        Some(filter) => WhereInput {
            type_id,
            node: &node,
        }
        .to_cypher(filter, translation)?,
        None => Predicate::True,
    };
    let fields = selected_fields(type_id, &field.subfields, translation);
    let auth_filter = crate::access::filter_rules(
        type_id,
        &fields,
        AuthOperation::Aggregate,
        &node,
        translation,
    )?;

    let source = AggregateSource {
        import: None,
        pattern: Pattern::node(node_pattern),
        predicate: Predicate::and_all([label_predicate, user_filter, auth_filter]),
        node: node.clone(),
        node_type: type_id,
        edge: None,
    };

    let type_name = format!("{}AggregateSelection", translation.typ(type_id).name);
    let (value, mut clauses) =
        aggregate_selection(&source, &field.subfields, &type_name, translation)?;
    clauses.push(Clause::Return(Projection::single(value, &node)));
    Ok(clauses)
}

/// `<rel>Aggregate(where:)` selected on a node bound to `source`
pub(crate) fn nested_aggregate(
    relationship_id: RelationshipId,
    source: &Variable,
    field: &ValidatedField,
    translation: &Translation,
    depth: usize,
) -> Result<(Expression, Vec<Clause>), Neo4jExecutionError> {
    translation.check_depth(depth + 1, &field.name)?;

    let relationship = translation.relationship(relationship_id);
    if !relationship.aggregate {
        return Err(Neo4jExecutionError::Validation(
            field.name.to_string(),
            format!(
                "Aggregations are disabled on {}.{}",
                translation.typ(relationship.owner).name,
                relationship.field_name
            ),
        ));
    }

    let edge = translation.scope.fresh_node();
    let node = translation.scope.fresh_node();
    let (target, label_predicate) = translation.target_node(relationship.target, &node);
    let directed = relationship.is_directed(field.get_argument("directed").and_then(Val::as_bool));
    let pattern =
        translation.relationship_pattern(source, relationship, Some(&edge), target, directed);
    let predicate = read_predicate(
        relationship.target,
        relationship.target,
        field.get_argument("where"),
        &[],
        AuthOperation::Aggregate,
        &node,
        translation,
    )?;

    let aggregate_source = AggregateSource {
        import: Some(source.clone()),
        pattern,
        predicate: Predicate::and(label_predicate, predicate),
        node,
        node_type: relationship.target,
        edge: relationship.properties.map(|properties| (edge, properties)),
    };

    let type_name = format!(
        "{}{}{}AggregationSelection",
        translation.typ(relationship.owner).name,
        translation.typ(relationship.target).name,
        upper_first(&relationship.field_name)
    );
    aggregate_selection(&aggregate_source, &field.subfields, &type_name, translation)
}

fn aggregate_selection(
    source: &AggregateSource,
    selection: &[ValidatedField],
    type_name: &str,
    translation: &Translation,
) -> Result<(Expression, Vec<Clause>), Neo4jExecutionError> {
    let mut entries = vec![];
    let mut subqueries = vec![];

    for field in selection {
        let value = match field.name.as_str() {
            "__typename" => Expression::string(type_name),
            "count" => {
                let result = translation.scope.fresh_var();
                let mut clauses = source.matching();
                clauses.push(Clause::Return(Projection::single(
                    Expression::function("count", vec![source.node.expr()]),
                    &result,
                )));
                subqueries.push(Clause::call(clauses));
                result.expr()
            }
            // Root aggregations select the fields of the type directly
            _ if source.import.is_none() => {
                let (value, subquery) =
                    field_aggregate(source, &source.node, source.node_type, field, translation)?;
                subqueries.push(subquery);
                value
            }
            "node" => {
                let (value, clauses) = fields_aggregate(
                    source,
                    &source.node,
                    source.node_type,
                    &field.subfields,
                    translation,
                )?;
                subqueries.extend(clauses);
                value
            }
            "edge" => {
                let Some((edge, edge_type)) = &source.edge else {
                    return Err(Neo4jExecutionError::Validation(
                        field.name.to_string(),
                        "The relationship has no properties to aggregate".to_string(),
                    ));
                };
                let (value, clauses) =
                    fields_aggregate(source, edge, *edge_type, &field.subfields, translation)?;
                subqueries.extend(clauses);
                value
            }
            _ => {
                return Err(Neo4jExecutionError::Validation(
                    field.name.to_string(),
                    format!("No such field on type {type_name}"),
                ));
            }
        };
        entries.push((field.output_name(), value));
    }

    Ok((Expression::Map(entries), subqueries))
}

/// `node { f { ... } g { ... } }`: one subquery per field
fn fields_aggregate(
    source: &AggregateSource,
    entity: &Variable,
    type_id: TypeId,
    selection: &[ValidatedField],
    translation: &Translation,
) -> Result<(Expression, Vec<Clause>), Neo4jExecutionError> {
    let mut entries = vec![];
    let mut subqueries = vec![];
    for field in selection {
        if field.name.as_str() == "__typename" {
            continue;
        }
        let (value, subquery) = field_aggregate(source, entity, type_id, field, translation)?;
        subqueries.push(subquery);
        entries.push((field.output_name(), value));
    }

    Ok((Expression::Map(entries), subqueries))
}

/// `f { min max average sum }` for numbers and temporals, `f { shortest longest }` for strings
fn field_aggregate(
    source: &AggregateSource,
    entity: &Variable,
    type_id: TypeId,
    field: &ValidatedField,
    translation: &Translation,
) -> Result<(Expression, Clause), Neo4jExecutionError> {
    let typ = translation.typ(type_id);
    let property = typ
        .field(&field.name)
        .and_then(|descriptor| descriptor.property())
        .ok_or_else(|| {
            Neo4jExecutionError::Validation(
                field.name.to_string(),
                format!("Cannot aggregate field of {}", typ.name),
            )
        })?;

    let result = translation.scope.fresh_var();
    let value = entity.property(&property.db_name);
    let mut clauses = source.matching();
    let mut aggregates = vec![];

    if property.scalar.is_textual() {
        let list = translation.scope.fresh_var();
        let mut ordered = Projection::variables(&[entity]);
        ordered.order_by = vec![SortItem {
            expression: Expression::function("size", vec![value.clone()]),
            direction: SortDirection::Desc,
        }];
        clauses.push(Clause::With(ordered));
        clauses.push(Clause::With(Projection::single(
            Expression::function("collect", vec![value]),
            &list,
        )));

        for aggregate in &field.subfields {
            let function = match aggregate.name.as_str() {
                "longest" => "head",
                "shortest" => "last",
                "__typename" => continue,
                _ => return Err(unsupported(aggregate, &field.name)),
            };
            aggregates.push((
                aggregate.output_name(),
                Expression::function(function, vec![list.expr()]),
            ));
        }
    } else {
        for aggregate in &field.subfields {
            let function = match aggregate.name.as_str() {
                "min" | "max" if property.scalar.is_ordered() => aggregate.name.as_str(),
                "average" if property.scalar.is_numeric() => "avg",
                "sum" if property.scalar.is_numeric() => "sum",
                "__typename" => continue,
                _ => return Err(unsupported(aggregate, &field.name)),
            };
            let aggregated = Expression::function(function, vec![value.clone()]);
            let aggregated = if property.scalar.is_temporal() {
                temporal_output(&property.scalar, aggregated)
            } else {
                aggregated
            };
            aggregates.push((aggregate.output_name(), aggregated));
        }
    }

    clauses.push(Clause::Return(Projection::single(
        Expression::Map(aggregates),
        &result,
    )));
    Ok((result.expr(), Clause::call(clauses)))
}

fn unsupported(aggregate: &ValidatedField, field_name: &str) -> Neo4jExecutionError {
    Neo4jExecutionError::Validation(
        aggregate.name.to_string(),
        format!("Cannot compute '{}' of '{field_name}'", aggregate.name),
    )
}

#[cfg(test)]
mod tests {
    use exo_cypher::{ExpressionBuilder, Query, assert_binding};

    use super::*;
    use crate::test_utils::{MOVIES, TestContext};

    #[test]
    fn root_aggregation() {
        let context = TestContext::new(MOVIES);
        let field = context.selection(
            r#"{ moviesAggregate(where: { title_CONTAINS: "Matrix" }) { count title { longest } createdAt { min } } }"#,
        );
        let translation = context.translation();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        assert_binding!(
            Query::Single(root_aggregate(movie, &field, &translation).unwrap()).to_cypher(),
            r#"CALL {
    MATCH (this:Movie)
    WHERE this.title CONTAINS $param0
    RETURN count(this) AS var0
}
CALL {
    MATCH (this:Movie)
    WHERE this.title CONTAINS $param0
    WITH this
    ORDER BY size(this.title) DESC
    WITH collect(this.title) AS var2
    RETURN { longest: head(var2) } AS var1
}
CALL {
    MATCH (this:Movie)
    WHERE this.title CONTAINS $param0
    RETURN { min: apoc.date.convertFormat(toString(min(this.createdAt)), "iso_zoned_date_time", "iso_offset_date_time") } AS var3
}
RETURN { count: var0, title: var1, createdAt: var3 } AS this"#,
            "param0" => "Matrix"
        );
    }

    #[test]
    fn relationship_aggregation() {
        let context = TestContext::new(MOVIES);
        let field = context.selection(
            "{ movies { actorsAggregate(where: { born_GT: 1960 }) { count node { born { max average } } edge { screenTime { sum } } } } }",
        );
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (movie, _) = context.schema.get_type("Movie").unwrap();
        let (actors, _) = context.schema.relationship_of(movie, "actors").unwrap();

        let (value, subqueries) =
            nested_aggregate(actors, &this, &field.subfields[0], &translation, 0).unwrap();

        assert_eq!(
            value.to_cypher().cypher,
            "{ count: var2, node: { born: var3 }, edge: { screenTime: var4 } }"
        );
        assert_binding!(
            Query::Single(subqueries).to_cypher(),
            "CALL {\n    WITH this\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WHERE this1.born > $param0\n    RETURN count(this1) AS var2\n}\nCALL {\n    WITH this\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WHERE this1.born > $param0\n    RETURN { max: max(this1.born), average: avg(this1.born) } AS var3\n}\nCALL {\n    WITH this\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WHERE this1.born > $param0\n    RETURN { sum: sum(this0.screenTime) } AS var4\n}",
            "param0" => 1960
        );
    }

    #[test]
    fn unsupported_aggregations() {
        let context = TestContext::new(MOVIES);
        let translation = context.translation();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        for query in [
            "{ moviesAggregate { title { sum } } }",
            "{ moviesAggregate { actors { count } } }",
            "{ moviesAggregate { average } }",
        ] {
            let field = context.selection(query);
            assert!(matches!(
                root_aggregate(movie, &field, &translation),
                Err(Neo4jExecutionError::Validation(..))
            ));
        }

        // Director has no relationship properties
        let field = context.selection("{ movies { directorAggregate { edge { name { longest } } } } }");
        let this = translation.scope.root_variable();
        let (director, _) = context.schema.relationship_of(movie, "director").unwrap();
        assert!(matches!(
            nested_aggregate(director, &this, &field.subfields[0], &translation, 0),
            Err(Neo4jExecutionError::Validation(..))
        ));
    }
}
