// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    CypherBuilder, Expression, ExpressionBuilder, Pattern, Predicate, Query, Template, Variable,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub target: Expression,
    pub value: Expression,
}

impl SetItem {
    pub fn new(target: Expression, value: Expression) -> Self {
        Self { target, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    pub expression: Expression,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expression: Expression,
    pub alias: Option<Variable>,
}

impl ProjectionItem {
    pub fn aliased(expression: impl Into<Expression>, alias: &Variable) -> Self {
        Self {
            expression: expression.into(),
            alias: Some(alias.clone()),
        }
    }

    pub fn plain(variable: &Variable) -> Self {
        Self {
            expression: variable.expr(),
            alias: None,
        }
    }
}

/// The body of a `WITH` or `RETURN` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub star: bool,
    pub distinct: bool,
    pub items: Vec<ProjectionItem>,
    /// Only rendered for `WITH`
    pub predicate: Predicate,
    pub order_by: Vec<SortItem>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
}

impl Projection {
    pub fn star() -> Self {
        Self {
            star: true,
            ..Self::items(vec![])
        }
    }

    pub fn items(items: Vec<ProjectionItem>) -> Self {
        Self {
            star: false,
            distinct: false,
            items,
            predicate: Predicate::True,
            order_by: vec![],
            skip: None,
            limit: None,
        }
    }

    pub fn variables(variables: &[&Variable]) -> Self {
        Self::items(
            variables
                .iter()
                .map(|variable| ProjectionItem::plain(variable))
                .collect(),
        )
    }

    pub fn single(expression: impl Into<Expression>, alias: &Variable) -> Self {
        Self::items(vec![ProjectionItem::aliased(expression, alias)])
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    fn build_items(&self, builder: &mut CypherBuilder) {
        if self.distinct {
            builder.push_str("DISTINCT ");
        }
        if self.star {
            builder.push('*');
            if !self.items.is_empty() {
                builder.push_str(", ");
            }
        }
        builder.push_iter(self.items.iter(), ", ", |builder, item| {
            item.expression.build(builder);
            if let Some(alias) = &item.alias {
                if item.expression != alias.expr() {
                    builder.push_str(" AS ");
                    alias.build(builder);
                }
            }
        });
    }

    fn build_pagination(&self, builder: &mut CypherBuilder) {
        if !self.order_by.is_empty() {
            builder.new_line();
            builder.push_str("ORDER BY ");
            builder.push_iter(self.order_by.iter(), ", ", |builder, item| {
                item.expression.build(builder);
                builder.push_str(match item.direction {
                    SortDirection::Asc => " ASC",
                    SortDirection::Desc => " DESC",
                });
            });
        }
        if let Some(skip) = &self.skip {
            builder.new_line();
            builder.push_str("SKIP ");
            skip.build(builder);
        }
        if let Some(limit) = &self.limit {
            builder.new_line();
            builder.push_str("LIMIT ");
            limit.build(builder);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match {
        optional: bool,
        pattern: Pattern,
        predicate: Predicate,
    },
    Create(Pattern),
    Merge {
        pattern: Pattern,
        on_create: Vec<SetItem>,
    },
    Set(Vec<SetItem>),
    Delete {
        detach: bool,
        items: Vec<Expression>,
    },
    With(Projection),
    Unwind {
        list: Expression,
        alias: Variable,
    },
    /// `CALL { ... }`
    Call(Box<Query>),
    Return(Projection),
    /// Statement text supplied by the schema author (`@cypher` fields)
    Raw(Template),
}

impl Clause {
    pub fn matching(pattern: Pattern, predicate: Predicate) -> Self {
        Clause::Match {
            optional: false,
            pattern,
            predicate,
        }
    }

    pub fn optional_matching(pattern: Pattern, predicate: Predicate) -> Self {
        Clause::Match {
            optional: true,
            pattern,
            predicate,
        }
    }

    /// `WITH <variables>`; the usual import at the top of a subquery.
    pub fn with_variables(variables: &[&Variable]) -> Self {
        Clause::With(Projection::variables(variables))
    }

    /// `WITH *` followed by `WHERE <predicate>`.
    pub fn filter(predicate: Predicate) -> Self {
        Clause::With(Projection::star().with_predicate(predicate))
    }

    pub fn call(clauses: Vec<Clause>) -> Self {
        Clause::Call(Box::new(Query::Single(clauses)))
    }
}

fn build_set_items(items: &[SetItem], builder: &mut CypherBuilder) {
    builder.push_iter(items.iter(), ", ", |builder, item| {
        item.target.build(builder);
        builder.push_str(" = ");
        item.value.build(builder);
    });
}

impl ExpressionBuilder for Clause {
    fn build(&self, builder: &mut CypherBuilder) {
        match self {
            Clause::Match {
                optional,
                pattern,
                predicate,
            } => {
                if *optional {
                    builder.push_str("OPTIONAL ");
                }
                builder.push_str("MATCH ");
                pattern.build(builder);
                if !predicate.is_true() {
                    builder.new_line();
                    builder.push_str("WHERE ");
                    predicate.build(builder);
                }
            }
            Clause::Create(pattern) => {
                builder.push_str("CREATE ");
                pattern.build(builder);
            }
            Clause::Merge { pattern, on_create } => {
                builder.push_str("MERGE ");
                pattern.build(builder);
                if !on_create.is_empty() {
                    builder.new_line();
                    builder.push_str("ON CREATE SET ");
                    build_set_items(on_create, builder);
                }
            }
            Clause::Set(items) => {
                builder.push_str("SET ");
                build_set_items(items, builder);
            }
            Clause::Delete { detach, items } => {
                if *detach {
                    builder.push_str("DETACH ");
                }
                builder.push_str("DELETE ");
                builder.push_elems(items, ", ");
            }
            Clause::With(projection) => {
                builder.push_str("WITH ");
                projection.build_items(builder);
                if !projection.predicate.is_true() {
                    builder.new_line();
                    builder.push_str("WHERE ");
                    projection.predicate.build(builder);
                }
                projection.build_pagination(builder);
            }
            Clause::Unwind { list, alias } => {
                builder.push_str("UNWIND ");
                list.build(builder);
                builder.push_str(" AS ");
                alias.build(builder);
            }
            Clause::Call(query) => {
                builder.push_str("CALL {");
                builder.indented(|builder| {
                    builder.new_line();
                    query.build(builder);
                });
                builder.new_line();
                builder.push('}');
            }
            Clause::Return(projection) => {
                builder.push_str("RETURN ");
                projection.build_items(builder);
                projection.build_pagination(builder);
            }
            Clause::Raw(template) => template.build(builder),
        }
    }
}
