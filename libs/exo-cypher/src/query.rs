// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{Clause, CypherBuilder, ExpressionBuilder};

/// A sequence of clauses, or several such sequences combined with `UNION`.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Single(Vec<Clause>),
    Union(Vec<Vec<Clause>>),
}

impl Query {
    /// Build a union from branches, degenerating to a single query when there is only one
    pub fn union(mut branches: Vec<Vec<Clause>>) -> Self {
        if branches.len() == 1 {
            Query::Single(branches.remove(0))
        } else {
            Query::Union(branches)
        }
    }
}

fn build_clauses(clauses: &[Clause], builder: &mut CypherBuilder) {
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            builder.new_line();
        }
        clause.build(builder);
    }
}

impl ExpressionBuilder for Query {
    fn build(&self, builder: &mut CypherBuilder) {
        match self {
            Query::Single(clauses) => build_clauses(clauses, builder),
            Query::Union(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        builder.new_line();
                        builder.push_str("UNION");
                        builder.new_line();
                    }
                    build_clauses(branch, builder);
                }
            }
        }
    }
}
