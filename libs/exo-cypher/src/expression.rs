// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{CypherBuilder, ExpressionBuilder, Param, Predicate, Query};

/// A variable bound in a statement (`this`, `this0`, `var1`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `<variable>.<property>`
    pub fn property(&self, property: &str) -> Expression {
        Expression::Property(Box::new(Expression::Variable(self.clone())), property.into())
    }

    pub fn expr(&self) -> Expression {
        Expression::Variable(self.clone())
    }
}

impl ExpressionBuilder for Variable {
    fn build(&self, builder: &mut CypherBuilder) {
        builder.push_identifier(&self.0);
    }
}

/// A value written inline into the statement text. User-supplied values never become literals;
/// they are always bound through [`Param`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub distinct: bool,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapProjectionItem {
    /// `.property`
    Property(String),
    /// `key: expression`
    Entry(String, Expression),
}

/// `variable { .a, b: expr }`
#[derive(Debug, Clone, PartialEq)]
pub struct MapProjection {
    pub variable: Variable,
    pub items: Vec<MapProjectionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Variable(Variable),
    Property(Box<Expression>, String),
    Param(Param),
    Literal(Literal),
    List(Vec<Expression>),
    Map(Vec<(String, Expression)>),
    MapProjection(MapProjection),
    Function(FunctionCall),
    Binary(Box<Expression>, BinaryOperator, Box<Expression>),
    /// `list[from..to]`
    Slice {
        list: Box<Expression>,
        from: Option<Box<Expression>>,
        to: Option<Box<Expression>>,
    },
    /// `-expression`
    Negate(Box<Expression>),
    /// `variable:Label`
    HasLabel(Variable, String),
    Exists(Box<Query>),
    Count(Box<Query>),
    Predicate(Box<Predicate>),
    /// `*`, as in `count(*)`
    Star,
}

impl Expression {
    pub fn param(value: impl Into<crate::CypherValue>) -> Self {
        Expression::Param(Param::new(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        Expression::Literal(Literal::Integer(value))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn count_all() -> Self {
        Expression::function("count", vec![Expression::Star])
    }

    pub fn function(name: &str, args: Vec<Expression>) -> Self {
        Expression::Function(FunctionCall {
            name: name.to_string(),
            distinct: false,
            args,
        })
    }

    pub fn distinct_function(name: &str, args: Vec<Expression>) -> Self {
        Expression::Function(FunctionCall {
            name: name.to_string(),
            distinct: true,
            args,
        })
    }

    pub fn property(self, property: &str) -> Self {
        Expression::Property(Box::new(self), property.to_string())
    }

    pub fn binary(self, op: BinaryOperator, rhs: Expression) -> Self {
        Expression::Binary(Box::new(self), op, Box::new(rhs))
    }

    pub fn map(entries: Vec<(&str, Expression)>) -> Self {
        Expression::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    /// Does this expression need parentheses when used as the base of a property access or as an
    /// operand?
    fn is_atomic(&self) -> bool {
        !matches!(
            self,
            Expression::Binary(..) | Expression::Negate(_) | Expression::Predicate(_)
        )
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::Variable(variable)
    }
}

impl From<Param> for Expression {
    fn from(param: Param) -> Self {
        Expression::Param(param)
    }
}

impl ExpressionBuilder for Literal {
    fn build(&self, builder: &mut CypherBuilder) {
        match self {
            Literal::Null => builder.push_str("NULL"),
            Literal::Boolean(true) => builder.push_str("true"),
            Literal::Boolean(false) => builder.push_str("false"),
            Literal::Integer(i) => builder.push_str(i.to_string()),
            Literal::Float(f) => {
                let mut s = f.to_string();
                if !s.contains(['.', 'e', 'E', 'N', 'i']) {
                    s.push_str(".0");
                }
                builder.push_str(s)
            }
            Literal::String(s) => builder.push_string_literal(s),
        }
    }
}

impl ExpressionBuilder for MapProjection {
    fn build(&self, builder: &mut CypherBuilder) {
        self.variable.build(builder);
        if self.items.is_empty() {
            builder.push_str(" { }");
            return;
        }
        builder.push_str(" { ");
        builder.push_iter(self.items.iter(), ", ", |builder, item| match item {
            MapProjectionItem::Property(name) => {
                builder.push('.');
                builder.push_identifier(name);
            }
            MapProjectionItem::Entry(key, value) => {
                builder.push_identifier(key);
                builder.push_str(": ");
                value.build(builder);
            }
        });
        builder.push_str(" }");
    }
}

impl ExpressionBuilder for Expression {
    fn build(&self, builder: &mut CypherBuilder) {
        match self {
            Expression::Variable(variable) => variable.build(builder),
            Expression::Property(base, property) => {
                build_operand(base, builder);
                builder.push('.');
                builder.push_identifier(property);
            }
            Expression::Param(param) => builder.push_param(param),
            Expression::Literal(literal) => literal.build(builder),
            Expression::List(elems) => {
                builder.push('[');
                builder.push_elems(elems, ", ");
                builder.push(']');
            }
            Expression::Map(entries) => {
                if entries.is_empty() {
                    builder.push_str("{}");
                    return;
                }
                builder.push_str("{ ");
                builder.push_iter(entries.iter(), ", ", |builder, (key, value)| {
                    builder.push_identifier(key);
                    builder.push_str(": ");
                    value.build(builder);
                });
                builder.push_str(" }");
            }
            Expression::MapProjection(projection) => projection.build(builder),
            Expression::Function(FunctionCall {
                name,
                distinct,
                args,
            }) => {
                builder.push_str(name);
                builder.push('(');
                if *distinct {
                    builder.push_str("DISTINCT ");
                }
                builder.push_elems(args, ", ");
                builder.push(')');
            }
            Expression::Binary(lhs, op, rhs) => {
                build_operand(lhs, builder);
                builder.push_str(match op {
                    BinaryOperator::Add => " + ",
                    BinaryOperator::Subtract => " - ",
                    BinaryOperator::Multiply => " * ",
                    BinaryOperator::Divide => " / ",
                });
                build_operand(rhs, builder);
            }
            Expression::Slice { list, from, to } => {
                build_operand(list, builder);
                builder.push('[');
                if let Some(from) = from {
                    from.build(builder);
                }
                builder.push_str("..");
                if let Some(to) = to {
                    to.build(builder);
                }
                builder.push(']');
            }
            Expression::Negate(expr) => {
                builder.push('-');
                build_operand(expr, builder);
            }
            Expression::HasLabel(variable, label) => {
                variable.build(builder);
                builder.push(':');
                builder.push_identifier(label);
            }
            Expression::Exists(query) => build_subquery_expression("EXISTS", query, builder),
            Expression::Count(query) => build_subquery_expression("COUNT", query, builder),
            Expression::Predicate(predicate) => predicate.build(builder),
            Expression::Star => builder.push('*'),
        }
    }
}

fn build_operand(expr: &Expression, builder: &mut CypherBuilder) {
    if expr.is_atomic() {
        expr.build(builder);
    } else {
        builder.push('(');
        expr.build(builder);
        builder.push(')');
    }
}

fn build_subquery_expression(keyword: &str, query: &Query, builder: &mut CypherBuilder) {
    builder.push_str(keyword);
    builder.push_str(" {");
    builder.indented(|builder| {
        builder.new_line();
        query.build(builder);
    });
    builder.new_line();
    builder.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CypherValue;

    #[test]
    fn property_access_on_params_and_variables() {
        let jwt = Param::named("jwt", CypherValue::Null);
        let expr = Expression::List(vec![
            Variable::new("this").property("title"),
            Expression::Param(jwt).property("https://example.com/roles"),
        ]);

        assert_binding!(
            expr.to_cypher(),
            "[this.title, $jwt.`https://example.com/roles`]",
            "jwt" => CypherValue::Null
        );
    }

    #[test]
    fn map_projection() {
        let projection = Expression::MapProjection(MapProjection {
            variable: Variable::new("this"),
            items: vec![
                MapProjectionItem::Property("title".into()),
                MapProjectionItem::Entry("actors".into(), Variable::new("var2").expr()),
                MapProjectionItem::Entry("__resolveType".into(), Expression::string("Movie")),
            ],
        });

        assert_binding!(
            projection.to_cypher(),
            r#"this { .title, actors: var2, __resolveType: "Movie" }"#
        );
    }

    #[test]
    fn list_slice_and_arithmetic() {
        let tags = Variable::new("this").property("tags");
        let pop = Param::new(1);
        let slice = Expression::Slice {
            list: Box::new(tags),
            from: Some(Box::new(Expression::integer(0))),
            to: Some(Box::new(Expression::Negate(Box::new(Expression::Param(pop))))),
        };
        assert_binding!(slice.to_cypher(), "this.tags[0..-$param0]", "param0" => 1);

        let sum = Variable::new("this")
            .property("count")
            .binary(BinaryOperator::Add, Expression::param(2));
        assert_binding!(sum.to_cypher(), "this.count + $param0", "param0" => 2);
        assert_binding!(Expression::count_all().to_cypher(), "count(*)");
    }

    #[test]
    fn functions() {
        let expr = Expression::distinct_function(
            "collect",
            vec![Expression::function("toFloat", vec![Expression::integer(3)])],
        );
        assert_binding!(expr.to_cypher(), "collect(DISTINCT toFloat(3))");
    }

    #[test]
    fn float_literals_keep_decimal_point() {
        assert_binding!(Expression::Literal(Literal::Float(2.0)).to_cypher(), "2.0");
        assert_binding!(Expression::Literal(Literal::Float(0.5)).to_cypher(), "0.5");
    }
}
