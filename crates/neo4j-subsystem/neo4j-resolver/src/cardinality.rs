// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Assertions that to-one relationships hold after a mutation. A violation aborts the statement
//! with a `RELATIONSHIP-REQUIRED` error naming the type and field.

use exo_cypher::{Clause, Expression, NodePattern, Predicate, Projection, Variable};
use neo4j_model::{
    relationship::{Cardinality, RelationshipId},
    types::TypeId,
};

use crate::{neo4j_execution_error::RELATIONSHIP_REQUIRED, translation::Translation};

/// Checks for the to-one relationships of a node: required ones when the node was just created,
/// plus every one the mutation touched
pub(crate) fn cardinality_checks(
    node: &Variable,
    type_id: TypeId,
    touched: &[RelationshipId],
    created: bool,
    translation: &Translation,
) -> Vec<Clause> {
    translation
        .typ(type_id)
        .fields
        .iter()
        .filter_map(|field| field.relationship())
        .filter(|id| {
            let relationship = translation.relationship(*id);
            relationship.cardinality == Cardinality::One
                && ((created && relationship.required) || touched.contains(id))
        })
        .flat_map(|id| cardinality_check(node, id, translation))
        .collect()
}

/// ```cypher
/// WITH *
/// CALL {
///     WITH this0
///     MATCH (this0)<-[this1:DIRECTED]-(:Person)
///     WITH count(this1) AS var2
///     WHERE apoc.util.validatePredicate(NOT (var2 = 1), "...Movie.director required exactly once", [0])
///     RETURN var2
/// }
/// ```
fn cardinality_check(
    node: &Variable,
    relationship_id: RelationshipId,
    translation: &Translation,
) -> [Clause; 2] {
    let relationship = translation.relationship(relationship_id);
    let edge = translation.scope.fresh_node();
    let count = translation.scope.fresh_var();

    // The end node is constrained by label only. Abstract targets have none, so any
    // implementation counts.
    let target = NodePattern::new(None, translation.typ(relationship.target).labels().to_vec());

    let (violated, message) = if relationship.required {
        (
            Predicate::Eq(count.expr(), Expression::integer(1)),
            "required exactly once",
        )
    } else {
        (
            Predicate::Lte(count.expr(), Expression::integer(1)),
            "must be less than or equal to one",
        )
    };
    let message = format!(
        "{RELATIONSHIP_REQUIRED}{}.{} {message}",
        translation.typ(relationship.owner).name,
        relationship.field_name
    );

    let assertion = Predicate::Expression(Expression::function(
        "apoc.util.validatePredicate",
        vec![
            Expression::Predicate(Box::new(Predicate::Not(Box::new(violated)))),
            Expression::string(message),
            Expression::List(vec![Expression::integer(0)]),
        ],
    ));

    let pattern = translation.relationship_pattern(node, relationship, Some(&edge), target, true);
    [
        Clause::With(Projection::star()),
        Clause::call(vec![
            Clause::with_variables(&[node]),
            Clause::matching(pattern, Predicate::True),
            Clause::With(
                Projection::single(Expression::function("count", vec![edge.expr()]), &count)
                    .with_predicate(assertion),
            ),
            Clause::Return(Projection::variables(&[&count])),
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use exo_cypher::{ExpressionBuilder, Query};

    use super::*;
    use crate::test_utils::{MOVIES, TestContext};

    #[test]
    fn to_one_checks() {
        let context = TestContext::new(
            r#"
            type Movie {
                title: String!
                director: Person! @relationship(type: "DIRECTED", direction: IN)
                studio: Studio @relationship(type: "PRODUCED", direction: OUT)
                actors: [Person!]! @relationship(type: "ACTED_IN", direction: IN)
            }
            type Person { name: String! }
            type Studio { name: String! }
            "#,
        );
        let translation = context.translation();
        let node = translation.scope.fresh_node();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        // Only the required director on creation
        let clauses = cardinality_checks(&node, movie, &[], true, &translation);
        assert_eq!(
            Query::Single(clauses).to_cypher().cypher,
            r#"WITH *
CALL {
    WITH this0
    MATCH (this0)<-[this1:DIRECTED]-(:Person)
    WITH count(this1) AS var2
    WHERE apoc.util.validatePredicate(NOT (var2 = 1), "@neo4j/graphql/RELATIONSHIP-REQUIREDMovie.director required exactly once", [0])
    RETURN var2
}"#
        );
    }

    #[test]
    fn touched_optional_relationships() {
        let context = TestContext::new(MOVIES);
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (movie, _) = context.schema.get_type("Movie").unwrap();
        let (director, _) = context.schema.relationship_of(movie, "director").unwrap();
        let (actors, _) = context.schema.relationship_of(movie, "actors").unwrap();

        assert!(cardinality_checks(&this, movie, &[actors], false, &translation).is_empty());

        let clauses = cardinality_checks(&this, movie, &[director, actors], false, &translation);
        assert_eq!(
            Query::Single(clauses).to_cypher().cypher,
            r#"WITH *
CALL {
    WITH this
    MATCH (this)<-[this0:DIRECTED]-(:Person)
    WITH count(this0) AS var1
    WHERE apoc.util.validatePredicate(NOT (var1 <= 1), "@neo4j/graphql/RELATIONSHIP-REQUIREDMovie.director must be less than or equal to one", [0])
    RETURN var1
}"#
        );
    }
}
