// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::types::{DocumentOperations, ExecutableDocument};
use async_graphql_value::Name;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::validation::validation_error::ValidationError;

use super::{operation::ValidatedOperation, operation_validator::OperationValidator};

/// Context for validating a document.
pub struct DocumentValidator {
    operation_name: Option<String>,
    variables: Option<Map<String, Value>>,
    query_depth_limit: usize,
}

impl DocumentValidator {
    pub fn new(
        operation_name: Option<String>,
        variables: Option<Map<String, Value>>,
        query_depth_limit: usize,
    ) -> Self {
        Self {
            operation_name,
            variables,
            query_depth_limit,
        }
    }

    /// Parse the query text and validate the resulting document
    pub fn validate_str(self, query: &str) -> Result<ValidatedOperation, ValidationError> {
        let document = async_graphql_parser::parse_query(query).map_err(|e| {
            let pos = e.positions().next().unwrap_or_default();
            ValidationError::QueryParsingFailed(e.to_string(), pos)
        })?;
        self.validate(document)
    }

    /// Validate the query payload.
    ///
    /// Validations performed:
    /// - Validate that either there is only one operation or the operation name specified matches one of the operations in the document
    /// - Validate that there is at least one operation
    /// - Other validations are delegated to the operation validator
    #[instrument(
        name = "DocumentValidator::validate"
        skip(self, document)
        )]
    pub fn validate(
        self,
        document: ExecutableDocument,
    ) -> Result<ValidatedOperation, ValidationError> {
        let (operation_name, raw_operation) = match document.operations {
            DocumentOperations::Single(operation) => Ok((self.operation_name, operation)),
            DocumentOperations::Multiple(mut operations) => match self.operation_name {
                None if operations.len() <= 1 => {
                    // async-graphql parses a named operation (`query Foo { ... }`) to
                    // `DocumentOperations::Multiple` even if there is only one operation, so the
                    // operation name is enforced only for truly multiple operations.
                    match operations.into_iter().next() {
                        Some((operation_name, operation)) => {
                            Ok((Some(operation_name.to_string()), operation))
                        }
                        None => Err(ValidationError::NoOperationFound),
                    }
                }
                None => Err(ValidationError::MultipleOperationsNoOperationName),
                Some(operation_name) => match operations.remove(&Name::new(&operation_name)) {
                    None => Err(ValidationError::MultipleOperationsUnmatchedOperationName(
                        operation_name,
                    )),
                    Some(operation) => Ok((Some(operation_name), operation)),
                },
            },
        }?;

        let operation_validator = OperationValidator::new(
            operation_name,
            self.variables,
            document.fragments,
            self.query_depth_limit,
        );

        operation_validator.validate(raw_operation)
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::new(None, None, usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_graphql_parser::types::OperationType;
    use common::value::Val;

    use crate::validation::field::ValidatedField;

    fn validate(query: &str, variables: Option<serde_json::Value>) -> Result<ValidatedOperation, ValidationError> {
        let variables = variables.and_then(|v| v.as_object().cloned());
        DocumentValidator::new(None, variables, 10).validate_str(query)
    }

    fn names(fields: &[ValidatedField]) -> Vec<String> {
        fields.iter().map(|f| f.output_name()).collect()
    }

    #[test]
    fn variables_and_defaults() {
        let operation = validate(
            r#"
            query($title: String!, $limit: Int = 5, $year: Int) {
                movies(where: { title: $title, year: $year }, options: { limit: $limit }) {
                    title
                }
            }
            "#,
            Some(serde_json::json!({ "title": "Up" })),
        )
        .unwrap();

        assert_eq!(operation.typ, OperationType::Query);
        let movies = &operation.fields[0];
        assert_eq!(
            movies.arguments["where"],
            Val::from(serde_json::json!({ "title": "Up", "year": null }))
        );
        assert_eq!(
            movies.arguments["options"],
            Val::from(serde_json::json!({ "limit": 5 }))
        );
    }

    #[test]
    fn missing_required_variable() {
        let result = validate("query($title: String!) { movies(where: { title: $title }) { title } }", None);
        assert!(matches!(result, Err(ValidationError::VariableNotFound(name, _)) if name == "title"));

        let result = validate("query { movies(where: { title: $title }) { title } }", None);
        assert!(matches!(result, Err(ValidationError::VariableNotFound(name, _)) if name == "title"));
    }

    #[test]
    fn fragments_are_flattened_with_type_conditions() {
        let operation = validate(
            r#"
            query {
                actors {
                    ...ActorName
                    actedIn {
                        title
                        ... on Movie { runtime }
                        ... on Series { episodes }
                    }
                }
            }
            fragment ActorName on Actor { name }
            "#,
            None,
        )
        .unwrap();

        let actors = &operation.fields[0];
        assert_eq!(names(&actors.subfields), vec!["name", "actedIn"]);
        assert_eq!(actors.subfields[0].type_condition.as_deref(), Some("Actor"));

        let acted_in = &actors.subfields[1].subfields;
        assert_eq!(names(acted_in), vec!["title", "runtime", "episodes"]);
        assert!(acted_in[1].applies_to("Movie", &["Show"]));
        assert!(!acted_in[1].applies_to("Series", &["Show"]));
        assert!(acted_in[0].applies_to("Series", &["Show"]));
    }

    #[test]
    fn skip_and_include() {
        let operation = validate(
            r#"
            query($withTitle: Boolean!) {
                movies {
                    id
                    title @include(if: $withTitle)
                    year @skip(if: true)
                    runtime @include(if: true)
                }
            }
            "#,
            Some(serde_json::json!({ "withTitle": false })),
        )
        .unwrap();

        assert_eq!(names(&operation.fields[0].subfields), vec!["id", "runtime"]);
    }

    #[test]
    fn mergeable_fields() {
        let operation = validate(
            r#"
            query {
               movies {
                    title
                    actors { name }
                    title
                    actors { born }
                    t: title
                }
            }
            "#,
            None,
        )
        .unwrap();

        let movies = &operation.fields[0];
        assert_eq!(names(&movies.subfields), vec!["title", "actors", "t"]);
        assert_eq!(names(&movies.subfields[1].subfields), vec!["name", "born"]);
    }

    #[test]
    fn unmergeable_fields() {
        let result = validate("query { movies { t: title t: year } }", None);
        assert!(matches!(result, Err(ValidationError::FieldConflict(name, _)) if name == "t"));
    }

    #[test]
    fn fragment_errors() {
        let result = validate("query { movies { ...Missing } }", None);
        assert!(matches!(result, Err(ValidationError::FragmentDefinitionNotFound(..))));

        let result = validate(
            "query { movies { ...A } } fragment A on Movie { ...B } fragment B on Movie { ...A }",
            None,
        );
        assert!(matches!(result, Err(ValidationError::FragmentCycle(..))));
    }

    #[test]
    fn operation_selection() {
        let query = "query A { movies { title } } query B { actors { name } }";

        let result = DocumentValidator::new(None, None, 10).validate_str(query);
        assert!(matches!(result, Err(ValidationError::MultipleOperationsNoOperationName)));

        let operation = DocumentValidator::new(Some("B".to_string()), None, 10)
            .validate_str(query)
            .unwrap();
        assert_eq!(operation.name.as_deref(), Some("B"));
        assert_eq!(names(&operation.fields), vec!["actors"]);

        let result = DocumentValidator::new(Some("C".to_string()), None, 10).validate_str(query);
        assert!(matches!(
            result,
            Err(ValidationError::MultipleOperationsUnmatchedOperationName(_))
        ));

        let operation = validate("query Named { movies { title } }", None).unwrap();
        assert_eq!(operation.name.as_deref(), Some("Named"));
    }

    #[test]
    fn depth_limit() {
        let result = DocumentValidator::new(None, None, 2)
            .validate_str("query { movies { actors { movies { title } } } }");
        assert!(matches!(result, Err(ValidationError::SelectionSetTooDeep(_))));
    }

    #[test]
    fn subscriptions_and_syntax_errors() {
        assert!(matches!(
            validate("subscription { movieCreated { title } }", None),
            Err(ValidationError::SubscriptionNotSupported(_))
        ));
        assert!(matches!(
            validate("query { movies { ", None),
            Err(ValidationError::QueryParsingFailed(..))
        ));
    }
}
