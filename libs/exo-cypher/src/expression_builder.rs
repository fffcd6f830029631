// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{CypherBuilder, CypherFragment};

/// A trait for types that can build themselves into Cypher.
///
/// Each constituent of a statement (expression, predicate, pattern, clause, query) implements
/// this trait, which can then be used to hierarchically build a Cypher string and the parameters
/// to be supplied to it.
pub trait ExpressionBuilder {
    /// Build the Cypher into the given builder
    fn build(&self, builder: &mut CypherBuilder);

    /// Build into a fresh builder and return the resulting fragment. Useful for tests and for
    /// the final step of rendering a statement.
    fn to_cypher(&self) -> CypherFragment
    where
        Self: Sized,
    {
        let mut builder = CypherBuilder::new();
        self.build(&mut builder);
        builder.into_fragment()
    }
}

impl<T> ExpressionBuilder for Box<T>
where
    T: ExpressionBuilder,
{
    fn build(&self, builder: &mut CypherBuilder) {
        self.as_ref().build(builder)
    }
}

impl<T> ExpressionBuilder for &T
where
    T: ExpressionBuilder,
{
    fn build(&self, builder: &mut CypherBuilder) {
        (**self).build(builder)
    }
}
