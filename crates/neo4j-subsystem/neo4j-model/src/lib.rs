// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The compiled schema model used by the Cypher translator.
//!
//! A [`Neo4jSchema`](schema::Neo4jSchema) is built once (see `neo4j-model-builder`) and is
//! read-only afterwards. Directive-driven behavior (aliases, timestamps, computed fields,
//! authorization rules) is resolved into the descriptors here, so translation never looks at
//! directives again.

pub mod access;
pub mod evaluate;
pub mod filter;
pub mod filter_parser;
pub mod relationship;
pub mod root;
pub mod schema;
pub mod types;

#[cfg(test)]
mod test_schema;
