// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::types::OperationType;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, instrument};

use core_resolver::validation::{field::ValidatedField, operation::ValidatedOperation};
use exo_cypher::{CypherFragment, CypherValue, ExpressionBuilder};
use neo4j_model::{
    root::{RootField, RootOperation},
    schema::Neo4jSchema,
};

use crate::{
    config::TranslatorConfig,
    context::TranslationContext,
    neo4j_execution_error::Neo4jExecutionError,
    neo4j_mutation::{create_query, delete_query, update_query},
    neo4j_query::{aggregate_query, read_query},
    translation::Translation,
};

const VERSION_PREFIX: &str = "CYPHER 5";

/// A root field translated into one parameterized statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedStatement {
    pub cypher: String,
    pub params: IndexMap<String, CypherValue>,
    /// The dispatch entry the statement was built for; decides how rows are shaped
    pub root: RootField,
    /// Key of the field in the response (the alias, if any)
    pub output_name: String,
}

impl TranslatedStatement {
    pub fn to_fragment(&self) -> CypherFragment {
        CypherFragment {
            cypher: self.cypher.clone(),
            params: self.params.clone(),
        }
    }
}

/// Translates the root fields of GraphQL operations against one schema.
///
/// The translator holds no per-request state; the claims and callback values of a request are
/// passed along with each call.
pub struct CypherTranslator<'a> {
    schema: &'a Neo4jSchema,
    config: TranslatorConfig,
}

impl<'a> CypherTranslator<'a> {
    pub fn new(schema: &'a Neo4jSchema, config: TranslatorConfig) -> Self {
        Self { schema, config }
    }

    /// One statement per root field, keyed by output name. A field that fails to translate
    /// doesn't affect the others.
    #[instrument(
        name = "CypherTranslator::translate_operation"
        skip_all
        fields(operation = ?operation.typ, name = ?operation.name)
        )]
    pub fn translate_operation(
        &self,
        operation: &ValidatedOperation,
        context: &TranslationContext,
    ) -> Vec<(String, Result<TranslatedStatement, Neo4jExecutionError>)> {
        operation
            .fields
            .iter()
            .map(|field| {
                (
                    field.output_name(),
                    self.translate_field(operation.typ, field, context),
                )
            })
            .collect()
    }

    #[instrument(
        name = "CypherTranslator::translate_field"
        skip(self, field, context)
        fields(field = %field.name)
        )]
    pub fn translate_field(
        &self,
        operation_type: OperationType,
        field: &ValidatedField,
        context: &TranslationContext,
    ) -> Result<TranslatedStatement, Neo4jExecutionError> {
        let root = self.root_field(operation_type, field)?;
        let translation = Translation::new(self.schema, context, &self.config);

        let query = match root.operation {
            RootOperation::Read => read_query(root.type_id, field, &translation),
            RootOperation::Aggregate => aggregate_query(root.type_id, field, &translation),
            RootOperation::Create => create_query(root.type_id, field, &translation),
            RootOperation::Update => update_query(root.type_id, field, &translation),
            RootOperation::Delete => delete_query(root.type_id, field, &translation),
        }?;

        let CypherFragment { cypher, params } = query.to_cypher();
        let cypher = if self.config.version_prefix {
            format!("{VERSION_PREFIX}\n{cypher}")
        } else {
            cypher
        };
        debug!(%cypher, params = params.len(), "Translated {}", root.name);

        Ok(TranslatedStatement {
            cypher,
            params,
            root: root.clone(),
            output_name: field.output_name(),
        })
    }

    fn root_field(
        &self,
        operation_type: OperationType,
        field: &ValidatedField,
    ) -> Result<&'a RootField, Neo4jExecutionError> {
        let schema: &'a Neo4jSchema = self.schema;
        let root = schema.root_field(&field.name).ok_or_else(|| {
            Neo4jExecutionError::Validation(field.name.to_string(), "No such root field".to_string())
        })?;

        let matches = match operation_type {
            OperationType::Query => !root.operation.is_mutation(),
            OperationType::Mutation => root.operation.is_mutation(),
            OperationType::Subscription => false,
        };
        if !matches {
            return Err(Neo4jExecutionError::Validation(
                field.name.to_string(),
                format!("Not a {operation_type} field"),
            ));
        }

        Ok(root)
    }
}
