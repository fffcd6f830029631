// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Shaping of database rows into the value of a root field.
//!
//! Statements project rows in the response shape already; what's left is unwrapping the result
//! column, dropping the internal keys and attaching the mutation counters reported by the
//! database.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use core_resolver::validation::field::ValidatedField;
use neo4j_model::root::RootOperation;

use crate::{connection::upper_first, neo4j_mutation::DATA_COLUMN, translator::TranslatedStatement};

/// Column of read and aggregate statements
const RESULT_COLUMN: &str = "this";
const INTERNAL_ID: &str = "__id";

/// Counters from the summary of an executed mutation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationCounters {
    pub nodes_created: i64,
    pub nodes_deleted: i64,
    pub relationships_created: i64,
    pub relationships_deleted: i64,
}

impl MutationCounters {
    fn get(&self, name: &str) -> Option<i64> {
        match name {
            "nodesCreated" => Some(self.nodes_created),
            "nodesDeleted" => Some(self.nodes_deleted),
            "relationshipsCreated" => Some(self.relationships_created),
            "relationshipsDeleted" => Some(self.relationships_deleted),
            _ => None,
        }
    }

    /// The selected counters, keyed by output name
    fn select(&self, subfields: &[ValidatedField], typename: &str) -> Value {
        let entries = subfields.iter().filter_map(|subfield| {
            let value = if subfield.name.as_str() == "__typename" {
                Value::String(typename.to_string())
            } else {
                Value::from(self.get(subfield.name.as_str())?)
            };
            Some((subfield.output_name(), value))
        });
        Value::Object(entries.collect())
    }
}

/// The value of `field` given the rows its statement returned
pub fn shape_response(
    statement: &TranslatedStatement,
    field: &ValidatedField,
    rows: Vec<Value>,
    counters: MutationCounters,
) -> Value {
    let root_name = upper_first(&statement.root.name);

    match statement.root.operation {
        RootOperation::Read => Value::Array(
            rows.into_iter()
                .filter_map(|row| column(row, RESULT_COLUMN))
                .map(strip_internal)
                .collect(),
        ),
        RootOperation::Aggregate => rows
            .into_iter()
            .next()
            .and_then(|row| column(row, RESULT_COLUMN))
            .map(strip_internal)
            .unwrap_or(Value::Null),
        RootOperation::Create | RootOperation::Update => {
            let data = rows
                .into_iter()
                .next()
                .and_then(|row| column(row, DATA_COLUMN))
                .map(strip_internal)
                .unwrap_or_else(|| Value::Array(vec![]));
            let info_typename = match statement.root.operation {
                RootOperation::Create => "CreateInfo",
                _ => "UpdateInfo",
            };

            let entries = field.subfields.iter().map(|subfield| {
                let value = match subfield.name.as_str() {
                    "__typename" => Value::String(format!("{root_name}MutationResponse")),
                    "info" => counters.select(&subfield.subfields, info_typename),
                    _ => data.clone(),
                };
                (subfield.output_name(), value)
            });
            Value::Object(entries.collect::<Map<_, _>>())
        }
        RootOperation::Delete => counters.select(&field.subfields, "DeleteInfo"),
    }
}

fn column(row: Value, name: &str) -> Option<Value> {
    match row {
        Value::Object(mut columns) => columns.remove(name).or_else(|| {
            warn!("Missing column {name} in result row");
            None
        }),
        _ => {
            warn!("Unexpected result row {row}");
            None
        }
    }
}

/// Drops the node ids projected for de-duplication, at any depth
fn strip_internal(value: Value) -> Value {
    match value {
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .filter(|(key, _)| key != INTERNAL_ID)
                .map(|(key, value)| (key, strip_internal(value)))
                .collect(),
        ),
        Value::Array(values) => Value::Array(values.into_iter().map(strip_internal).collect()),
        value => value,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_utils::{MOVIES, PRODUCTIONS, TestContext};

    fn shape(
        context: &TestContext,
        query: &str,
        rows: Vec<Value>,
        counters: MutationCounters,
    ) -> Value {
        let statement = context.translate(query).unwrap();
        let field = context.selection(query);
        shape_response(&statement, &field, rows, counters)
    }

    #[test]
    fn read_rows() {
        let context = TestContext::new(PRODUCTIONS);

        assert_eq!(
            shape(
                &context,
                "{ productions { title } }",
                vec![
                    json!({ "this": { "title": "Heat", "__resolveType": "Movie", "__id": 4 } }),
                    json!({ "this": { "title": "Dark", "__resolveType": "Series", "__id": 7 } }),
                ],
                MutationCounters::default(),
            ),
            json!([
                { "title": "Heat", "__resolveType": "Movie" },
                { "title": "Dark", "__resolveType": "Series" }
            ])
        );
    }

    #[test]
    fn aggregate_row() {
        let context = TestContext::new(MOVIES);

        assert_eq!(
            shape(
                &context,
                "{ moviesAggregate { count } }",
                vec![json!({ "this": { "count": 3 } })],
                MutationCounters::default(),
            ),
            json!({ "count": 3 })
        );
    }

    #[test]
    fn mutation_responses() {
        let context = TestContext::new(MOVIES);
        let counters = MutationCounters {
            nodes_created: 2,
            nodes_deleted: 0,
            relationships_created: 1,
            relationships_deleted: 0,
        };

        assert_eq!(
            shape(
                &context,
                r#"mutation {
                    createMovies(input: [{ title: "Heat" }]) {
                        __typename
                        created: movies { title actors { name } }
                        info { nodesCreated relationshipsCreated }
                    }
                }"#,
                vec![json!({ "data": [{ "title": "Heat", "actors": [{ "name": "Al", "__id": 1 }] }] })],
                counters,
            ),
            json!({
                "__typename": "CreateMoviesMutationResponse",
                "created": [{ "title": "Heat", "actors": [{ "name": "Al" }] }],
                "info": { "nodesCreated": 2, "relationshipsCreated": 1 }
            })
        );

        // An update matching nothing still returns its counters
        assert_eq!(
            shape(
                &context,
                r#"mutation { updateMovies(where: { title: "None" }) { movies { title } info { nodesDeleted } } }"#,
                vec![],
                MutationCounters::default(),
            ),
            json!({ "movies": [], "info": { "nodesDeleted": 0 } })
        );

        assert_eq!(
            shape(
                &context,
                r#"mutation { deleteMovies(where: { title: "Heat" }) { nodesDeleted relationshipsDeleted } }"#,
                vec![],
                MutationCounters {
                    nodes_deleted: 1,
                    relationships_deleted: 3,
                    ..MutationCounters::default()
                },
            ),
            json!({ "nodesDeleted": 1, "relationshipsDeleted": 3 })
        );
    }

    #[test]
    fn counters_serialize_camel_case() {
        assert_eq!(
            serde_json::to_value(MutationCounters {
                nodes_created: 1,
                ..MutationCounters::default()
            })
            .unwrap(),
            json!({ "nodesCreated": 1, "nodesDeleted": 0, "relationshipsCreated": 0, "relationshipsDeleted": 0 })
        );
    }
}
