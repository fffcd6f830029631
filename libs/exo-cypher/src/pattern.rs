// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{CypherBuilder, Expression, ExpressionBuilder, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(a)-[]->(b)`
    Outgoing,
    /// `(a)<-[]-(b)`
    Incoming,
    /// `(a)-[]-(b)`
    Undirected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: Option<Variable>,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expression)>,
}

impl NodePattern {
    pub fn new(variable: Option<Variable>, labels: Vec<String>) -> Self {
        Self {
            variable,
            labels,
            properties: vec![],
        }
    }

    /// A node already bound by an earlier clause: `(this)`
    pub fn bound(variable: &Variable) -> Self {
        Self::new(Some(variable.clone()), vec![])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<Variable>,
    pub rel_type: String,
    pub direction: Direction,
}

/// A path pattern: a start node followed by zero or more (relationship, node) hops.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub chain: Vec<(RelationshipPattern, NodePattern)>,
}

impl Pattern {
    pub fn node(node: NodePattern) -> Self {
        Self {
            start: node,
            chain: vec![],
        }
    }

    pub fn related(start: NodePattern, relationship: RelationshipPattern, end: NodePattern) -> Self {
        Self {
            start,
            chain: vec![(relationship, end)],
        }
    }
}

impl ExpressionBuilder for NodePattern {
    fn build(&self, builder: &mut CypherBuilder) {
        builder.push('(');
        if let Some(variable) = &self.variable {
            variable.build(builder);
        }
        for label in &self.labels {
            builder.push(':');
            builder.push_identifier(label);
        }
        if !self.properties.is_empty() {
            builder.push_str(" { ");
            builder.push_iter(self.properties.iter(), ", ", |builder, (key, value)| {
                builder.push_identifier(key);
                builder.push_str(": ");
                value.build(builder);
            });
            builder.push_str(" }");
        }
        builder.push(')');
    }
}

impl ExpressionBuilder for RelationshipPattern {
    fn build(&self, builder: &mut CypherBuilder) {
        builder.push_str(match self.direction {
            Direction::Incoming => "<-[",
            _ => "-[",
        });
        if let Some(variable) = &self.variable {
            variable.build(builder);
        }
        builder.push(':');
        builder.push_identifier(&self.rel_type);
        builder.push_str(match self.direction {
            Direction::Outgoing => "]->",
            _ => "]-",
        });
    }
}

impl ExpressionBuilder for Pattern {
    fn build(&self, builder: &mut CypherBuilder) {
        self.start.build(builder);
        for (relationship, node) in &self.chain {
            relationship.build(builder);
            node.build(builder);
        }
    }
}
