// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use core_resolver::{
    context::JwtClaims,
    validation::{document_validator::DocumentValidator, field::ValidatedField},
};
use neo4j_model::schema::Neo4jSchema;

use crate::{
    config::TranslatorConfig, context::TranslationContext,
    neo4j_execution_error::Neo4jExecutionError, translation::Translation,
    translator::{CypherTranslator, TranslatedStatement},
};

pub(crate) const MOVIES: &str = r#"
    type Movie {
        id: ID! @id
        title: String! @unique
        year: Int @alias(property: "released")
        rating: Float @coalesce(value: 0.0)
        tags: [String!]
        releaseDate: Date
        createdAt: DateTime @timestamp(operations: [CREATE])
        actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN, properties: "ActedIn")
        director: Person @relationship(type: "DIRECTED", direction: IN)
        actorCount: Int! @cypher(statement: "MATCH (this)<-[:ACTED_IN]-(a) RETURN count(a) AS c", columnName: "c")
        similar(limit: Int): [Movie!]! @cypher(statement: "MATCH (this)--(m:Movie) RETURN m LIMIT $limit", columnName: "m")
        summary: String @customResolver(requires: "title year")
    }

    type Actor {
        name: String!
        born: Int
        movies: [Movie!]! @relationship(type: "ACTED_IN", direction: OUT, properties: "ActedIn")
    }

    type Person {
        name: String! @unique
    }

    type ActedIn @relationshipProperties {
        role: String
        screenTime: Int
    }
"#;

pub(crate) const PRODUCTIONS: &str = r#"
    interface Production {
        title: String!
    }

    type Movie implements Production {
        title: String!
        runtime: Int
    }

    type Series implements Production {
        title: String!
        episodes: Int
    }

    type Actor {
        name: String!
        actedIn: [Production!]! @relationship(type: "ACTED_IN", direction: OUT)
    }

    union Search = Movie | Actor
"#;

pub(crate) struct TestContext {
    pub schema: Neo4jSchema,
    pub context: TranslationContext,
    pub config: TranslatorConfig,
}

impl TestContext {
    pub fn new(sdl: &str) -> Self {
        Self {
            schema: neo4j_model_builder::build_from_sdl(sdl).unwrap(),
            context: TranslationContext::default(),
            config: TranslatorConfig::default(),
        }
    }

    pub fn with_claims(mut self, claims: serde_json::Value) -> Self {
        self.context.claims = Some(JwtClaims::from_json(claims).unwrap());
        self
    }

    pub fn translation(&self) -> Translation<'_> {
        Translation::new(&self.schema, &self.context, &self.config)
    }

    /// The root field of a query document, validated
    pub fn selection(&self, query: &str) -> ValidatedField {
        let mut operation = DocumentValidator::new(None, None, usize::MAX)
            .validate_str(query)
            .unwrap();
        operation.fields.remove(0)
    }

    pub fn translate(&self, query: &str) -> Result<TranslatedStatement, Neo4jExecutionError> {
        let operation = DocumentValidator::new(None, None, usize::MAX)
            .validate_str(query)
            .unwrap();

        CypherTranslator::new(&self.schema, self.config.clone()).translate_field(
            operation.typ,
            &operation.fields[0],
            &self.context,
        )
    }
}
