// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A small Cypher AST along with a builder that renders it into a statement string and a parameter map.
//!
//! Every element of a statement (expressions, predicates, patterns, clauses) implements
//! [`ExpressionBuilder`], so a statement is rendered by building its root into a [`CypherBuilder`].
//! Parameters are carried in the AST as [`Param`] values and are only named (`param0`, `param1`,
//! ...) during rendering, in the order they appear in the statement text. This makes the output
//! deterministic and guarantees that every `$name` in the text has exactly one entry in the
//! parameter map.

#[macro_use]
mod test_util;

mod clause;
mod cypher_builder;
mod cypher_value;
mod expression;
mod expression_builder;
mod fragment;
mod identifier;
mod param;
mod pattern;
mod predicate;
mod query;
mod template;

pub use clause::{Clause, Projection, ProjectionItem, SetItem, SortDirection, SortItem};
pub use cypher_builder::CypherBuilder;
pub use cypher_value::{CypherValue, CypherValueError};
pub use expression::{
    BinaryOperator, Expression, FunctionCall, Literal, MapProjection, MapProjectionItem, Variable,
};
pub use expression_builder::ExpressionBuilder;
pub use fragment::{CypherFragment, FragmentError};
pub use identifier::IdentifierScope;
pub use param::Param;
pub use pattern::{Direction, NodePattern, Pattern, RelationshipPattern};
pub use predicate::Predicate;
pub use query::Query;
pub use template::{Template, TemplateError, TemplatePart};
