// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{CypherBuilder, Expression, ExpressionBuilder, expression::Literal};

/// A predicate is a boolean expression that can be used in a WHERE clause.
#[derive(Debug, PartialEq, Clone)]
pub enum Predicate {
    True,
    False,
    Eq(Expression, Expression),
    Neq(Expression, Expression),
    Lt(Expression, Expression),
    Lte(Expression, Expression),
    Gt(Expression, Expression),
    Gte(Expression, Expression),
    In(Expression, Expression),

    // string predicates
    Contains(Expression, Expression),
    StartsWith(Expression, Expression),
    EndsWith(Expression, Expression),
    Matches(Expression, Expression),

    /// Any boolean-valued expression (`EXISTS { ... }`, a function call, ...)
    Expression(Expression),

    // Prefer Predicate::and(), which simplifies the clause
    And(Box<Predicate>, Box<Predicate>),
    // Prefer Predicate::or(), which simplifies the clause
    Or(Box<Predicate>, Box<Predicate>),
    // Prefer Predicate::not(), which simplifies the clause
    Not(Box<Predicate>),
}

impl Predicate {
    /// Logical and of two predicates, reducing to a simpler predicate if possible.
    pub fn and(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::False, _) | (_, Predicate::False) => Predicate::False,
            (Predicate::True, rhs) => rhs,
            (lhs, Predicate::True) => lhs,
            (lhs, rhs) if lhs == rhs => lhs,
            (lhs, rhs) => Predicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Logical or of two predicates, reducing to a simpler predicate if possible.
    pub fn or(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (Predicate::False, rhs) => rhs,
            (lhs, Predicate::False) => lhs,
            (lhs, rhs) if lhs == rhs => lhs,
            (lhs, rhs) => Predicate::Or(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn and_all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        predicates
            .into_iter()
            .fold(Predicate::True, Predicate::and)
    }

    /// Or of all predicates. An empty set of predicates is `False`.
    pub fn or_all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        predicates
            .into_iter()
            .fold(Predicate::False, Predicate::or)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Predicate::True)
    }
}

fn contains_null(expr: &Expression) -> bool {
    matches!(expr, Expression::Literal(Literal::Null))
}

impl From<bool> for Predicate {
    fn from(b: bool) -> Predicate {
        if b { Predicate::True } else { Predicate::False }
    }
}

impl From<Expression> for Predicate {
    fn from(expr: Expression) -> Predicate {
        Predicate::Expression(expr)
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        match self {
            // Reduced to a simpler form when possible, else fall back to Predicate::Not. The
            // relational flips keep three-valued semantics: both sides are null exactly when
            // an operand is null.
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Eq(lhs, rhs) => Predicate::Neq(lhs, rhs),
            Predicate::Neq(lhs, rhs) => Predicate::Eq(lhs, rhs),
            Predicate::Lt(lhs, rhs) => Predicate::Gte(lhs, rhs),
            Predicate::Lte(lhs, rhs) => Predicate::Gt(lhs, rhs),
            Predicate::Gt(lhs, rhs) => Predicate::Lte(lhs, rhs),
            Predicate::Gte(lhs, rhs) => Predicate::Lt(lhs, rhs),
            Predicate::Not(predicate) => *predicate,
            predicate => Predicate::Not(Box::new(predicate)),
        }
    }
}

impl ExpressionBuilder for Predicate {
    /// Build a predicate into a Cypher string.
    fn build(&self, builder: &mut CypherBuilder) {
        match &self {
            Predicate::True => builder.push_str("true"),
            Predicate::False => builder.push_str("false"),
            Predicate::Eq(lhs, rhs) => {
                if contains_null(rhs) {
                    lhs.build(builder);
                    builder.push_str(" IS NULL");
                } else {
                    relational_combine(lhs, rhs, "=", builder)
                }
            }
            Predicate::Neq(lhs, rhs) => {
                if contains_null(rhs) {
                    lhs.build(builder);
                    builder.push_str(" IS NOT NULL");
                } else {
                    relational_combine(lhs, rhs, "<>", builder)
                }
            }
            Predicate::Lt(lhs, rhs) => relational_combine(lhs, rhs, "<", builder),
            Predicate::Lte(lhs, rhs) => relational_combine(lhs, rhs, "<=", builder),
            Predicate::Gt(lhs, rhs) => relational_combine(lhs, rhs, ">", builder),
            Predicate::Gte(lhs, rhs) => relational_combine(lhs, rhs, ">=", builder),
            Predicate::In(lhs, rhs) => relational_combine(lhs, rhs, "IN", builder),
            Predicate::Contains(lhs, rhs) => relational_combine(lhs, rhs, "CONTAINS", builder),
            Predicate::StartsWith(lhs, rhs) => {
                relational_combine(lhs, rhs, "STARTS WITH", builder)
            }
            Predicate::EndsWith(lhs, rhs) => relational_combine(lhs, rhs, "ENDS WITH", builder),
            Predicate::Matches(lhs, rhs) => relational_combine(lhs, rhs, "=~", builder),
            Predicate::Expression(expr) => expr.build(builder),
            Predicate::And(lhs, rhs) => logical_combine(lhs, rhs, "AND", builder),
            Predicate::Or(lhs, rhs) => logical_combine(lhs, rhs, "OR", builder),
            Predicate::Not(predicate) => match predicate.as_ref() {
                // Already parenthesized
                Predicate::And(..) | Predicate::Or(..) => {
                    builder.push_str("NOT ");
                    predicate.build(builder);
                }
                _ => {
                    builder.push_str("NOT (");
                    predicate.build(builder);
                    builder.push(')');
                }
            },
        }
    }
}

/// Combine two expressions with a relational operator.
fn relational_combine<E1: ExpressionBuilder, E2: ExpressionBuilder>(
    left: &E1,
    right: &E2,
    op: &'static str,
    builder: &mut CypherBuilder,
) {
    left.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_space();
    right.build(builder);
}

/// Combine two predicates with a logical binary operator.
fn logical_combine<E1: ExpressionBuilder, E2: ExpressionBuilder>(
    left: &E1,
    right: &E2,
    op: &'static str,
    builder: &mut CypherBuilder,
) {
    builder.push('(');
    left.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_space();
    right.build(builder);
    builder.push(')');
}
