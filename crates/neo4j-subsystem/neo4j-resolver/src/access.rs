// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Authorization rules turned into predicates.
//!
//! Filter rules narrow what a `MATCH` sees. Validation rules become `apoc.util.validatePredicate`
//! assertions that abort the statement with a `FORBIDDEN` error. Whatever can be decided from the
//! claims alone (JWT filters, rules requiring authentication for anonymous callers) is reduced
//! to `true`/`false` here, so the statement only carries the parts that depend on the data.

use common::value::Val;
use core_resolver::context::JwtClaims;
use exo_cypher::{Clause, Expression, Predicate, Variable};
use neo4j_model::{
    access::{AuthOperation, AuthPredicate, AuthorizationAnnotation, ValidationTiming},
    evaluate::{PropertySource, evaluate},
    types::{FieldDescriptor, TypeId},
};
use tracing::debug;

use crate::{
    neo4j_execution_error::{FORBIDDEN, Neo4jExecutionError},
    predicate_mapper::filter_predicate,
    translation::Translation,
};

/// Fail early when the type requires an authenticated caller for the operation
pub(crate) fn check_authentication(
    type_id: TypeId,
    operation: AuthOperation,
    translation: &Translation,
) -> Result<(), Neo4jExecutionError> {
    if translation.typ(type_id).requires_authentication(operation)
        && !translation.context.is_authenticated()
    {
        debug!(
            type_name = translation.typ(type_id).name,
            ?operation,
            "Unauthenticated access"
        );
        return Err(Neo4jExecutionError::Unauthenticated);
    }
    Ok(())
}

fn annotations<'a>(
    type_id: TypeId,
    fields: &[&'a FieldDescriptor],
    translation: &Translation<'a>,
) -> Vec<&'a AuthorizationAnnotation> {
    translation
        .typ(type_id)
        .authorization
        .iter()
        .chain(fields.iter().filter_map(|field| field.authorization.as_ref()))
        .collect()
}

/// The filter rules of a type (and of the given fields) for an operation: rules of one annotation
/// are OR-ed, annotations are AND-ed. `true` when nothing applies.
pub(crate) fn filter_rules(
    type_id: TypeId,
    fields: &[&FieldDescriptor],
    operation: AuthOperation,
    node: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    // A node being created can't be narrowed
    if operation == AuthOperation::Create {
        return Ok(Predicate::True);
    }

    let mut predicates = vec![];
    for annotation in annotations(type_id, fields, translation) {
        let mut rules = annotation.filters_for(operation).peekable();
        if rules.peek().is_none() {
            continue;
        }

        let mut alternatives = vec![];
        for rule in rules {
            alternatives.push(rule_predicate(
                &rule.predicate,
                rule.require_authentication,
                node,
                translation,
            )?);
        }
        predicates.push(Predicate::or_all(alternatives));
    }

    Ok(Predicate::and_all(predicates))
}

/// The validation rules for an operation and timing, wrapped in an assertion. `None` when no rule
/// applies or the rules hold whatever the data.
pub(crate) fn validate_rules(
    type_id: TypeId,
    fields: &[&FieldDescriptor],
    operation: AuthOperation,
    timing: ValidationTiming,
    node: &Variable,
    translation: &Translation,
) -> Result<Option<Predicate>, Neo4jExecutionError> {
    let mut predicates = vec![];
    for annotation in annotations(type_id, fields, translation) {
        let mut rules = annotation.validations_for(operation, timing).peekable();
        if rules.peek().is_none() {
            continue;
        }

        let mut alternatives = vec![];
        for rule in rules {
            alternatives.push(rule_predicate(
                &rule.predicate,
                rule.require_authentication,
                node,
                translation,
            )?);
        }
        predicates.push(Predicate::or_all(alternatives));
    }

    // A rule that can never hold still becomes an assertion, so it only fails for matched rows
    match Predicate::and_all(predicates) {
        Predicate::True => Ok(None),
        predicate => {
            if predicate == Predicate::False {
                debug!(
                    type_name = translation.typ(type_id).name,
                    ?operation,
                    "Validation rules can't hold for the caller"
                );
            }
            Ok(Some(assertion(predicate)))
        }
    }
}

/// `WITH * WHERE <assertions>` for the validation rules of several nodes, `None` when no rule
/// depends on the data
pub(crate) fn validation_clause(
    nodes: &[(TypeId, &Variable)],
    operation: AuthOperation,
    timing: ValidationTiming,
    translation: &Translation,
) -> Result<Option<Clause>, Neo4jExecutionError> {
    let mut assertions = vec![];
    for (type_id, node) in nodes {
        assertions.extend(validate_rules(*type_id, &[], operation, timing, node, translation)?);
    }
    Ok(match Predicate::and_all(assertions) {
        Predicate::True => None,
        predicate => Some(Clause::filter(predicate)),
    })
}

/// `apoc.util.validatePredicate(NOT (<predicate>), "@neo4j/graphql/FORBIDDEN", [0])`
pub(crate) fn assertion(predicate: Predicate) -> Predicate {
    Predicate::Expression(Expression::function(
        "apoc.util.validatePredicate",
        vec![
            Expression::Predicate(Box::new(Predicate::Not(Box::new(predicate)))),
            Expression::string(FORBIDDEN),
            Expression::List(vec![Expression::integer(0)]),
        ],
    ))
}

fn rule_predicate(
    predicate: &AuthPredicate,
    require_authentication: bool,
    node: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    if require_authentication && !translation.context.is_authenticated() {
        return Ok(Predicate::False);
    }
    auth_predicate(predicate, node, translation)
}

fn auth_predicate(
    predicate: &AuthPredicate,
    node: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    Ok(match predicate {
        AuthPredicate::Node(filter) => filter_predicate(filter, node, translation)?,
        AuthPredicate::Jwt(filter) => match &translation.context.claims {
            Some(claims) => (evaluate(filter, &ClaimsSource(claims)) == Some(true)).into(),
            None => Predicate::False,
        },
        AuthPredicate::And(predicates) => Predicate::and_all(
            predicates
                .iter()
                .map(|predicate| auth_predicate(predicate, node, translation))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AuthPredicate::Or(predicates) => Predicate::or_all(
            predicates
                .iter()
                .map(|predicate| auth_predicate(predicate, node, translation))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AuthPredicate::Not(predicate) => !auth_predicate(predicate, node, translation)?,
    })
}

/// Claims looked up by (possibly dotted) path
struct ClaimsSource<'a>(&'a JwtClaims);

impl PropertySource for ClaimsSource<'_> {
    fn get_property(&self, name: &str) -> Option<&Val> {
        self.0.get_path(name)
    }
}

#[cfg(test)]
mod tests {
    use exo_cypher::{CypherValue, ExpressionBuilder, assert_binding};
    use serde_json::json;

    use super::*;
    use crate::test_utils::TestContext;

    const POSTS: &str = r#"
        type JWT @jwt {
            roles: [String!]! @jwtClaim(path: "app.roles")
            sub: String!
        }

        type Post @authorization(
            filter: [{ where: { node: { authorId: "$jwt.sub" } } }, { where: { jwt: { roles_INCLUDES: "admin" } } }]
            validate: [{ operations: [UPDATE], when: [BEFORE], where: { node: { authorId: "$jwt.sub" } } }]
        ) @authentication(operations: [DELETE]) {
            authorId: ID!
            title: String
            secret: String @authorization(filter: [{ requireAuthentication: false, where: { node: { title: "public" } } }])
        }
    "#;

    fn post_filter(context: &TestContext, fields: &[&str], operation: AuthOperation) -> Predicate {
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (post, typ) = context.schema.get_type("Post").unwrap();
        let fields: Vec<_> = fields.iter().map(|f| typ.field(f).unwrap()).collect();
        filter_rules(post, &fields, operation, &this, &translation).unwrap()
    }

    #[test]
    fn filters_with_claims() {
        let context = TestContext::new(POSTS).with_claims(json!({ "sub": "u1", "app": { "roles": ["user"] } }));

        assert_binding!(
            post_filter(&context, &[], AuthOperation::Read).to_cypher(),
            "this.authorId = $jwt.sub",
            "jwt" => CypherValue::Map([
                ("sub".to_string(), CypherValue::from("u1")),
                ("app".to_string(), CypherValue::Map([("roles".to_string(), CypherValue::from(vec!["user"]))].into_iter().collect())),
            ].into_iter().collect())
        );

        let admin = TestContext::new(POSTS).with_claims(json!({ "sub": "u1", "app": { "roles": ["admin"] } }));
        assert_eq!(post_filter(&admin, &[], AuthOperation::Read), Predicate::True);
    }

    #[test]
    fn anonymous_callers() {
        let context = TestContext::new(POSTS);

        assert_eq!(post_filter(&context, &[], AuthOperation::Read), Predicate::False);
        // Filters never apply to creation
        assert_eq!(post_filter(&context, &[], AuthOperation::Create), Predicate::True);

        let translation = context.translation();
        let (post, _) = context.schema.get_type("Post").unwrap();
        assert!(matches!(
            check_authentication(post, AuthOperation::Delete, &translation),
            Err(Neo4jExecutionError::Unauthenticated)
        ));
        assert!(check_authentication(post, AuthOperation::Read, &translation).is_ok());
    }

    #[test]
    fn field_rules_are_conjoined() {
        let context = TestContext::new(POSTS).with_claims(json!({ "sub": "u1", "app": { "roles": ["admin"] } }));

        assert_binding!(
            post_filter(&context, &["secret"], AuthOperation::Read).to_cypher(),
            "this.title = $param0",
            "param0" => "public"
        );
    }

    #[test]
    fn validation_assertions() {
        let context = TestContext::new(POSTS).with_claims(json!({ "sub": "u1", "app": { "roles": [] } }));
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (post, _) = context.schema.get_type("Post").unwrap();

        let predicate = validate_rules(
            post,
            &[],
            AuthOperation::Update,
            ValidationTiming::Before,
            &this,
            &translation,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            predicate.to_cypher().cypher,
            r#"apoc.util.validatePredicate(NOT (this.authorId = $jwt.sub), "@neo4j/graphql/FORBIDDEN", [0])"#
        );

        assert!(validate_rules(
            post,
            &[],
            AuthOperation::Update,
            ValidationTiming::After,
            &this,
            &translation,
        )
        .unwrap()
        .is_none());

        // Without claims the rule can't hold, but only rows that are actually matched trip it
        let anonymous = TestContext::new(POSTS);
        let translation = anonymous.translation();
        let predicate = validate_rules(
            post,
            &[],
            AuthOperation::Update,
            ValidationTiming::Before,
            &this,
            &translation,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            predicate.to_cypher().cypher,
            r#"apoc.util.validatePredicate(NOT (false), "@neo4j/graphql/FORBIDDEN", [0])"#
        );
    }
}
