// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;
use exo_cypher::{
    BinaryOperator, Clause, CypherValue, Expression, Pattern, Predicate, Projection,
    ProjectionItem, Query, Variable,
};
use neo4j_model::{
    filter::{
        AggregateFunction, AggregateSide, AggregateWhere, ComparisonOp, ConnectionWhere,
        FilterExpression, FilterValue, NumericOp, PropertyComparison, PropertyTarget, Quantifier,
    },
    filter_parser::FilterParser,
    relationship::{RelationshipDescriptor, RelationshipId},
    types::TypeId,
};

use crate::{
    cast::{CastError, coalesce_expression, value_expression},
    cypher_mapper::CypherMapper,
    neo4j_execution_error::Neo4jExecutionError,
    translation::Translation,
};

/// The `where` argument of a node type, applied to `node`
pub(crate) struct WhereInput<'a> {
    pub type_id: TypeId,
    pub node: &'a Variable,
}

impl<'a> CypherMapper<'a, Predicate> for WhereInput<'_> {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<Predicate, Neo4jExecutionError> {
        let filter = FilterParser::new(translation.schema)
            .parse(self.type_id, argument)
            .map_err(|e| Neo4jExecutionError::invalid_filter("where", e))?;

        filter_predicate(&filter, self.node, translation)
    }
}

/// A `where: { node, edge }` argument of a relationship traversal
pub(crate) struct ConnectionWhereInput<'a> {
    pub relationship: &'a RelationshipDescriptor,
    pub type_id: TypeId,
    pub node: &'a Variable,
    pub edge: &'a Variable,
}

impl<'a> CypherMapper<'a, Predicate> for ConnectionWhereInput<'_> {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<Predicate, Neo4jExecutionError> {
        let filter = FilterParser::new(translation.schema)
            .parse_connection_where(self.relationship, self.type_id, "where", argument)
            .map_err(|e| Neo4jExecutionError::invalid_filter("where", e))?;

        connection_predicate(&filter, self.node, self.edge, translation)
    }
}

pub(crate) fn filter_predicate(
    filter: &FilterExpression,
    node: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    Ok(match filter {
        FilterExpression::And(filters) => Predicate::and_all(
            filters
                .iter()
                .map(|filter| filter_predicate(filter, node, translation))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        FilterExpression::Or(filters) => Predicate::or_all(
            filters
                .iter()
                .map(|filter| filter_predicate(filter, node, translation))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        FilterExpression::Not(filter) => !filter_predicate(filter, node, translation)?,
        FilterExpression::Comparison(comparison) => {
            comparison_predicate(comparison, node, translation)?
        }
        FilterExpression::Relationship {
            relationship,
            quantifier,
            branches,
        } => {
            let relationship = translation.relationship(*relationship);
            let directed = relationship.is_directed(None);

            let matches = branches
                .iter()
                .map(|branch| {
                    let target = translation.scope.fresh_node();
                    let pattern = translation.relationship_pattern(
                        node,
                        relationship,
                        None,
                        translation.node_pattern(branch.type_id, &target),
                        directed,
                    );
                    let predicate = match &branch.filter {
                        Some(filter) => filter_predicate(filter, &target, translation)?,
                        None => Predicate::True,
                    };
                    Ok(QuantifiedMatch { pattern, predicate })
                })
                .collect::<Result<Vec<_>, Neo4jExecutionError>>()?;

            quantified(*quantifier, &matches)
        }
        FilterExpression::Connection {
            relationship,
            quantifier,
            branches,
        } => {
            let relationship = translation.relationship(*relationship);
            let directed = relationship.is_directed(None);

            let matches = branches
                .iter()
                .map(|branch| {
                    let edge = translation.scope.fresh_node();
                    let target = translation.scope.fresh_node();
                    let pattern = translation.relationship_pattern(
                        node,
                        relationship,
                        Some(&edge),
                        translation.node_pattern(branch.type_id, &target),
                        directed,
                    );
                    let predicate =
                        connection_predicate(&branch.predicate, &target, &edge, translation)?;
                    Ok(QuantifiedMatch { pattern, predicate })
                })
                .collect::<Result<Vec<_>, Neo4jExecutionError>>()?;

            quantified(*quantifier, &matches)
        }
        FilterExpression::Aggregate {
            relationship,
            filter,
        } => aggregate_predicate(*relationship, filter, node, translation)?,
    })
}

pub(crate) fn connection_predicate(
    predicate: &ConnectionWhere,
    node: &Variable,
    edge: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    let all = |predicates: &[ConnectionWhere]| {
        predicates
            .iter()
            .map(|predicate| connection_predicate(predicate, node, edge, translation))
            .collect::<Result<Vec<_>, _>>()
    };

    Ok(match predicate {
        ConnectionWhere::And(predicates) => Predicate::and_all(all(predicates)?),
        ConnectionWhere::Or(predicates) => Predicate::or_all(all(predicates)?),
        ConnectionWhere::Not(predicate) => {
            !connection_predicate(predicate, node, edge, translation)?
        }
        ConnectionWhere::Node(filter) => filter_predicate(filter, node, translation)?,
        ConnectionWhere::Edge(filter) => filter_predicate(filter, edge, translation)?,
    })
}

/// `node.property`, or `coalesce(node.property, <value>)` for a property declaring `@coalesce`
pub(crate) fn property_expression(
    node: &Variable,
    target: &PropertyTarget,
) -> Result<Expression, CastError> {
    let property = node.property(&target.db_name);
    Ok(match &target.coalesce {
        Some(value) => Expression::function("coalesce", vec![property, coalesce_expression(value)?]),
        None => property,
    })
}

fn comparison_predicate(
    comparison: &PropertyComparison,
    node: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    let target = &comparison.property;
    let lhs = property_expression(node, target)?;

    let rhs = match &comparison.value {
        FilterValue::Literal(value) => {
            let list = match comparison.op {
                ComparisonOp::In => true,
                ComparisonOp::Includes => false,
                _ => target.list,
            };
            value_expression(value, &target.scalar, list)?
        }
        FilterValue::JwtClaim(path) => match jwt_reference(path, translation)? {
            Some(reference) => reference,
            // Nothing to compare with, so the comparison can't hold
            None => return Ok(Predicate::False),
        },
    };

    Ok(match comparison.op {
        ComparisonOp::Eq => Predicate::Eq(lhs, rhs),
        ComparisonOp::In => Predicate::In(lhs, rhs),
        ComparisonOp::Includes => Predicate::In(rhs, lhs),
        ComparisonOp::Lt => Predicate::Lt(lhs, rhs),
        ComparisonOp::Lte => Predicate::Lte(lhs, rhs),
        ComparisonOp::Gt => Predicate::Gt(lhs, rhs),
        ComparisonOp::Gte => Predicate::Gte(lhs, rhs),
        ComparisonOp::Contains => Predicate::Contains(lhs, rhs),
        ComparisonOp::StartsWith => Predicate::StartsWith(lhs, rhs),
        ComparisonOp::EndsWith => Predicate::EndsWith(lhs, rhs),
        ComparisonOp::Matches => Predicate::Matches(lhs, rhs),
    })
}

/// `$jwt.<path>`, or `None` when the caller has no such claim
pub(crate) fn jwt_reference(
    path: &str,
    translation: &Translation,
) -> Result<Option<Expression>, Neo4jExecutionError> {
    let Some(claims) = &translation.context.claims else {
        return Ok(None);
    };
    // A declared claim may live elsewhere in the token (`@jwtClaim(path:)`)
    let path = translation
        .schema
        .jwt_claim(path)
        .map_or(path, |claim| claim.path.as_str());
    match claims.get_path(path) {
        None | Some(Val::Null) => return Ok(None),
        Some(_) => {}
    }
    let Some(jwt) = translation.jwt_param()? else {
        return Ok(None);
    };

    let base = Expression::Param(jwt);
    Ok(Some(if claims.contains_key(path) {
        base.property(path)
    } else {
        path.split('.')
            .fold(base, |expression, segment| expression.property(segment))
    }))
}

/// One `MATCH` of a quantified relationship filter, per concrete target type
struct QuantifiedMatch {
    pattern: Pattern,
    predicate: Predicate,
}

impl QuantifiedMatch {
    fn query(&self, predicate: Predicate) -> Box<Query> {
        Box::new(Query::Single(vec![Clause::matching(
            self.pattern.clone(),
            predicate,
        )]))
    }

    fn exists(&self, predicate: Predicate) -> Predicate {
        Predicate::Expression(Expression::Exists(self.query(predicate)))
    }

    fn count(&self) -> Expression {
        Expression::Count(self.query(self.predicate.clone()))
    }
}

fn quantified(quantifier: Quantifier, matches: &[QuantifiedMatch]) -> Predicate {
    match quantifier {
        Quantifier::Some => Predicate::or_all(
            matches
                .iter()
                .map(|m| m.exists(m.predicate.clone())),
        ),
        Quantifier::None => Predicate::and_all(
            matches
                .iter()
                .map(|m| !m.exists(m.predicate.clone())),
        ),
        Quantifier::All => {
            // An empty set of related nodes does not satisfy ALL
            let any = Predicate::or_all(matches.iter().map(|m| m.exists(Predicate::True)));
            let none_failing = Predicate::and_all(matches.iter().map(|m| {
                if m.predicate.is_true() {
                    Predicate::True
                } else {
                    !m.exists(!m.predicate.clone())
                }
            }));
            Predicate::and(any, none_failing)
        }
        Quantifier::Single => {
            let count = matches
                .iter()
                .map(QuantifiedMatch::count)
                .reduce(|sum, count| sum.binary(BinaryOperator::Add, count));
            match count {
                Some(count) => Predicate::Eq(count, Expression::integer(1)),
                None => Predicate::False,
            }
        }
    }
}

/// Aggregations computed by an aggregate filter, each bound to a variable. The same aggregation
/// used by several conditions is computed once.
#[derive(Default)]
struct AggregateColumns {
    columns: Vec<(Expression, Variable)>,
}

impl AggregateColumns {
    fn column(&mut self, aggregation: Expression, translation: &Translation) -> Variable {
        if let Some((_, variable)) = self
            .columns
            .iter()
            .find(|(existing, _)| existing == &aggregation)
        {
            return variable.clone();
        }
        let variable = translation.scope.fresh_var();
        self.columns.push((aggregation, variable.clone()));
        variable
    }
}

/// `EXISTS { MATCH <pattern> WITH <aggregations> WHERE <conditions> RETURN ... }`
fn aggregate_predicate(
    relationship: RelationshipId,
    filter: &AggregateWhere,
    node: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    let relationship = translation.relationship(relationship);
    let edge = translation.scope.fresh_node();
    let target = translation.scope.fresh_node();
    let (target_pattern, label_predicate) = translation.target_node(relationship.target, &target);
    let pattern = translation.relationship_pattern(
        node,
        relationship,
        Some(&edge),
        target_pattern,
        relationship.is_directed(None),
    );

    let mut columns = AggregateColumns::default();
    let condition = aggregate_condition(filter, &target, &edge, &mut columns, translation)?;

    let Some((_, first)) = columns.columns.first() else {
        // Only trivially true (or false) conditions; nothing to compute
        return Ok(condition);
    };
    let first = first.clone();

    let items = columns
        .columns
        .into_iter()
        .map(|(aggregation, variable)| ProjectionItem::aliased(aggregation, &variable))
        .collect();

    Ok(Predicate::Expression(Expression::Exists(Box::new(
        Query::Single(vec![
            Clause::matching(pattern, label_predicate),
            Clause::With(Projection::items(items).with_predicate(condition)),
            Clause::Return(Projection::variables(&[&first])),
        ]),
    ))))
}

fn aggregate_condition(
    filter: &AggregateWhere,
    node: &Variable,
    edge: &Variable,
    columns: &mut AggregateColumns,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    Ok(match filter {
        AggregateWhere::And(filters) => {
            let mut predicates = vec![];
            for filter in filters {
                predicates.push(aggregate_condition(filter, node, edge, columns, translation)?);
            }
            Predicate::and_all(predicates)
        }
        AggregateWhere::Or(filters) => {
            let mut predicates = vec![];
            for filter in filters {
                predicates.push(aggregate_condition(filter, node, edge, columns, translation)?);
            }
            Predicate::or_all(predicates)
        }
        AggregateWhere::Not(filter) => {
            !aggregate_condition(filter, node, edge, columns, translation)?
        }
        AggregateWhere::Count(op, count) => {
            let column = columns.column(
                Expression::function("count", vec![node.expr()]),
                translation,
            );
            numeric_comparison(*op, column.expr(), Expression::param(*count))
        }
        AggregateWhere::Property {
            side,
            property,
            function,
            op,
            value,
        } => {
            let subject = match side {
                AggregateSide::Node => node,
                AggregateSide::Edge => edge,
            };
            let target = subject.property(&property.db_name);
            let size = || Expression::function("size", vec![target.clone()]);

            let (aggregation, threshold) = match function {
                AggregateFunction::ShortestLength => (
                    Expression::function("min", vec![size()]),
                    integer_param(value)?,
                ),
                AggregateFunction::LongestLength => (
                    Expression::function("max", vec![size()]),
                    integer_param(value)?,
                ),
                AggregateFunction::AverageLength => (
                    Expression::function(
                        "avg",
                        vec![Expression::function("toFloat", vec![size()])],
                    ),
                    float_param(value)?,
                ),
                AggregateFunction::Average => (
                    Expression::function(
                        "avg",
                        vec![Expression::function("toFloat", vec![target.clone()])],
                    ),
                    float_param(value)?,
                ),
                AggregateFunction::Min => (
                    Expression::function("min", vec![target.clone()]),
                    value_expression(value, &property.scalar, false)?,
                ),
                AggregateFunction::Max => (
                    Expression::function("max", vec![target.clone()]),
                    value_expression(value, &property.scalar, false)?,
                ),
                AggregateFunction::Sum => (
                    Expression::function("sum", vec![target.clone()]),
                    value_expression(value, &property.scalar, false)?,
                ),
            };

            let column = columns.column(aggregation, translation);
            numeric_comparison(*op, column.expr(), threshold)
        }
    })
}

fn numeric_comparison(op: NumericOp, lhs: Expression, rhs: Expression) -> Predicate {
    match op {
        NumericOp::Equal => Predicate::Eq(lhs, rhs),
        NumericOp::Lt => Predicate::Lt(lhs, rhs),
        NumericOp::Lte => Predicate::Lte(lhs, rhs),
        NumericOp::Gt => Predicate::Gt(lhs, rhs),
        NumericOp::Gte => Predicate::Gte(lhs, rhs),
    }
}

fn integer_param(value: &Val) -> Result<Expression, CastError> {
    value
        .as_i64()
        .map(Expression::param)
        .ok_or_else(|| CastError::Mismatch {
            expected: "Int".to_string(),
            actual: value.kind().to_string(),
        })
}

fn float_param(value: &Val) -> Result<Expression, CastError> {
    match value {
        Val::Number(number) => Ok(Expression::param(CypherValue::Float(number.as_f64()))),
        _ => Err(CastError::Mismatch {
            expected: "Float".to_string(),
            actual: value.kind().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use exo_cypher::{ExpressionBuilder, assert_binding};
    use serde_json::json;

    use super::*;
    use crate::test_utils::{MOVIES, TestContext};

    fn movie_where(context: &TestContext, filter: serde_json::Value) -> Predicate {
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        WhereInput {
            type_id: movie,
            node: &this,
        }
        .to_cypher(&Val::from(filter), &translation)
        .unwrap()
    }

    #[test]
    fn comparisons() {
        let context = TestContext::new(MOVIES);

        assert_binding!(
            movie_where(&context, json!({ "title": "Matrix", "year_GT": 1990 })).to_cypher(),
            "(this.title = $param0 AND this.released > $param1)",
            "param0" => "Matrix",
            "param1" => 1990
        );
        assert_binding!(
            movie_where(&context, json!({ "title_NOT_IN": ["Matrix"] })).to_cypher(),
            "NOT (this.title IN $param0)",
            "param0" => vec!["Matrix"]
        );
        assert_binding!(
            movie_where(&context, json!({ "year": null })).to_cypher(),
            "this.released IS NULL"
        );
        assert_binding!(
            movie_where(&context, json!({ "rating_GTE": 4.5 })).to_cypher(),
            "coalesce(this.rating, 0.0) >= $param0",
            "param0" => 4.5
        );
        assert_binding!(
            movie_where(&context, json!({ "tags_INCLUDES": "classic" })).to_cypher(),
            "$param0 IN this.tags",
            "param0" => "classic"
        );
    }

    #[test]
    fn logical_combinations() {
        let context = TestContext::new(MOVIES);

        assert_binding!(
            movie_where(
                &context,
                json!({ "OR": [{ "title_STARTS_WITH": "The" }, { "NOT": { "year_LT": 2000 } }] })
            )
            .to_cypher(),
            "(this.title STARTS WITH $param0 OR this.released >= $param1)",
            "param0" => "The",
            "param1" => 2000
        );
        assert_binding!(movie_where(&context, json!({})).to_cypher(), "true");
    }

    #[test]
    fn relationship_quantifiers() {
        let context = TestContext::new(MOVIES);

        assert_binding!(
            movie_where(&context, json!({ "actors_SOME": { "name": "Keanu" } })).to_cypher(),
            "EXISTS {\n    MATCH (this)<-[:ACTED_IN]-(this0:Actor)\n    WHERE this0.name = $param0\n}",
            "param0" => "Keanu"
        );
        assert_binding!(
            movie_where(&context, json!({ "actors_ALL": { "name": "Keanu" } })).to_cypher(),
            "(EXISTS {\n    MATCH (this)<-[:ACTED_IN]-(this0:Actor)\n} AND NOT (EXISTS {\n    MATCH (this)<-[:ACTED_IN]-(this0:Actor)\n    WHERE this0.name <> $param0\n}))",
            "param0" => "Keanu"
        );
        assert_binding!(
            movie_where(&context, json!({ "actors_SINGLE": { "name": "Keanu" } })).to_cypher(),
            "COUNT {\n    MATCH (this)<-[:ACTED_IN]-(this0:Actor)\n    WHERE this0.name = $param0\n} = 1",
            "param0" => "Keanu"
        );
        assert_binding!(
            movie_where(&context, json!({ "director": null })).to_cypher(),
            "NOT (EXISTS {\n    MATCH (this)<-[:DIRECTED]-(this0:Person)\n})"
        );
    }

    #[test]
    fn connection_filter() {
        let context = TestContext::new(MOVIES);

        assert_binding!(
            movie_where(
                &context,
                json!({ "actorsConnection_NONE": { "node": { "name": "Keanu" }, "edge": { "role": "Neo" } } })
            )
            .to_cypher(),
            "NOT (EXISTS {\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WHERE (this1.name = $param0 AND this0.role = $param1)\n})",
            "param0" => "Keanu",
            "param1" => "Neo"
        );
    }

    #[test]
    fn aggregate_filter() {
        let context = TestContext::new(MOVIES);

        assert_binding!(
            movie_where(&context, json!({ "actorsAggregate": { "count": 2 } })).to_cypher(),
            "EXISTS {\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WITH count(this1) AS var2\n    WHERE var2 = $param0\n    RETURN var2\n}",
            "param0" => 2
        );

        assert_binding!(
            movie_where(
                &context,
                json!({ "actorsAggregate": {
                    "count_GT": 1,
                    "node": { "name_AVERAGE_LENGTH_GT": 3, "name_SHORTEST_LENGTH_LT": 2 }
                } })
            )
            .to_cypher(),
            "EXISTS {\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WITH count(this1) AS var2, avg(toFloat(size(this1.name))) AS var3, min(size(this1.name)) AS var4\n    WHERE (var2 > $param0 AND (var3 > $param1 AND var4 < $param2))\n    RETURN var2\n}",
            "param0" => 1,
            "param1" => 3.0,
            "param2" => 2
        );
    }

    #[test]
    fn jwt_references() {
        let context = TestContext::new(MOVIES).with_claims(json!({ "sub": "user-1" }));
        let translation = context.translation();
        let this = translation.scope.root_variable();

        assert_binding!(
            jwt_reference("sub", &translation).unwrap().unwrap().to_cypher(),
            "$jwt.sub",
            "jwt" => CypherValue::Map([("sub".to_string(), CypherValue::from("user-1"))].into_iter().collect())
        );
        assert!(jwt_reference("roles", &translation).unwrap().is_none());
        assert_eq!(this.name(), "this");
    }
}
