// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;

use crate::{neo4j_execution_error::Neo4jExecutionError, translation::Translation};

/// Map a GraphQL argument to a piece of Cypher (a predicate, sort items, clauses...).
///
/// The implementing type carries the schema element the argument is interpreted against (the
/// type being filtered, the relationship being mutated) along with the variables it applies to.
pub(crate) trait CypherMapper<'a, R> {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<R, Neo4jExecutionError>;
}
