// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

pub use config::{ConfigError, TranslatorConfig};
pub use context::TranslationContext;
pub use neo4j_execution_error::{Neo4jExecutionError, WithContext};
pub use response::{MutationCounters, shape_response};
pub use translator::{CypherTranslator, TranslatedStatement};

mod access;
mod aggregate;
mod cardinality;
mod cast;
mod config;
mod connection;
mod context;
mod create_data_mapper;
mod cypher_field;
mod cypher_mapper;
mod delete_mapper;
mod neo4j_execution_error;
mod neo4j_mutation;
mod neo4j_query;
mod order_by_mapper;
mod predicate_mapper;
mod projection;
mod relationship_mapper;
mod response;
mod translation;
mod translator;
mod update_data_mapper;

#[cfg(test)]
mod test_utils;
