// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Test assertion to check Cypher statements and parameters.

/// Assert that a [`CypherFragment`](crate::CypherFragment) has the expected text and parameters
/// (in order of appearance).
///
/// # Usage:
/// ```no_run
/// assert_binding!(fragment, "MATCH (this:Movie)\nWHERE this.title = $param0", "param0" => "Matrix");
/// ```
#[macro_export]
macro_rules! assert_binding {
    ($actual:expr, $expected_cypher:expr) => {{
        let fragment: $crate::CypherFragment = $actual;
        assert_eq!(fragment.cypher, $expected_cypher);
        assert!(
            fragment.params.is_empty(),
            "Extra actual parameters: {:?}",
            fragment.params
        );
    }};
    ($actual:expr, $expected_cypher:expr, $($name:expr => $value:expr),+ $(,)?) => {{
        let fragment: $crate::CypherFragment = $actual;
        assert_eq!(fragment.cypher, $expected_cypher);
        let expected: Vec<(String, $crate::CypherValue)> =
            vec![$(($name.to_string(), $crate::CypherValue::from($value))),+];
        let actual: Vec<(String, $crate::CypherValue)> = fragment.params.into_iter().collect();
        assert_eq!(actual, expected, "Parameter mismatch");
    }};
}
