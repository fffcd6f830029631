// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Build a [`Neo4jSchema`] from type definitions annotated with directives.
//!
//! The build either produces a complete model or fails with the first [`SchemaError`]; no
//! partial model is ever returned.

mod access_builder;
mod directives;
pub mod error;
mod field_builder;
mod naming;
mod relationship_builder;
mod root_builder;
mod type_builder;

use async_graphql_parser::parse_schema;
use tracing::{debug, instrument};

use neo4j_model::schema::Neo4jSchema;

pub use error::SchemaError;

#[instrument(name = "neo4j_model_builder::build", skip(sdl))]
pub fn build_from_sdl(sdl: &str) -> Result<Neo4jSchema, SchemaError> {
    let document = parse_schema(sdl).map_err(|error| SchemaError::Parse(error.to_string()))?;

    let mut building = type_builder::build_shallow(&document)?;
    field_builder::build_expanded(&mut building)?;
    relationship_builder::resolve_counterparts(&mut building.schema)?;
    field_builder::validate_requires(&building)?;
    access_builder::build_jwt(&mut building)?;
    access_builder::build_access(&mut building)?;
    root_builder::build_root_fields(&mut building.schema)?;

    debug!(
        types = building.schema.types.len(),
        relationships = building.schema.relationships.len(),
        root_fields = building.schema.root_fields.len(),
        "Built schema"
    );

    Ok(building.schema)
}

#[cfg(test)]
mod tests {
    use neo4j_model::{
        access::{AuthOperation, AuthPredicate, ValidationTiming},
        relationship::{Cardinality, QueryDirection, RelationshipDirection},
        root::RootOperation,
        types::{CypherReturnType, FieldKind, ScalarType, TypeKind, WriteOperation},
    };

    use super::*;

    const MOVIES: &str = r#"
        type Movie @node(labels: ["Movie", "Film"]) {
            id: ID! @id
            title: String! @unique
            year: Int @alias(property: "released")
            rating: Float @coalesce(value: 0.0)
            createdAt: DateTime! @timestamp(operations: [CREATE])
            actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN, properties: "ActedIn")
            director: Person! @relationship(type: "DIRECTED", direction: IN, nestedOperations: [CONNECT, DISCONNECT])
            actorCount: Int! @cypher(statement: "MATCH (this)<-[:ACTED_IN]-(a) RETURN count(a) AS c", columnName: "c")
            similar(limit: Int = 5): [Movie!]! @cypher(statement: "MATCH (this)--(m:Movie) RETURN m LIMIT $limit", columnName: "m")
            summary: String @customResolver(requires: "title year")
        }

        type Actor {
            name: String!
            movies: [Movie!]! @relationship(type: "ACTED_IN", direction: OUT, properties: "ActedIn", queryDirection: DEFAULT_UNDIRECTED)
        }

        type Person {
            name: String!
        }

        type ActedIn @relationshipProperties {
            role: String
        }
    "#;

    fn field_kind<'a>(schema: &'a Neo4jSchema, type_name: &str, field: &str) -> &'a FieldKind {
        &schema.get_type(type_name).unwrap().1.field(field).unwrap().kind
    }

    #[test]
    fn builds_types_and_properties() {
        let schema = build_from_sdl(MOVIES).unwrap();
        let (_, movie) = schema.get_type("Movie").unwrap();

        assert_eq!(movie.labels(), ["Movie", "Film"]);
        assert_eq!(movie.plural, "movies");

        let FieldKind::Property(id) = field_kind(&schema, "Movie", "id") else {
            panic!("Expected a property");
        };
        assert!(id.autogenerate && id.unique);

        let FieldKind::Property(year) = field_kind(&schema, "Movie", "year") else {
            panic!("Expected a property");
        };
        assert_eq!(year.db_name, "released");
        assert_eq!(year.scalar, ScalarType::Int);

        let FieldKind::Property(created_at) = field_kind(&schema, "Movie", "createdAt") else {
            panic!("Expected a property");
        };
        assert_eq!(created_at.timestamp, vec![WriteOperation::Create]);

        let (_, acted_in) = schema.get_type("ActedIn").unwrap();
        assert!(matches!(acted_in.kind, TypeKind::RelationshipProperties));
    }

    #[test]
    fn builds_relationships_with_counterparts() {
        let schema = build_from_sdl(MOVIES).unwrap();
        let (movie_id, _) = schema.get_type("Movie").unwrap();
        let (actor_id, _) = schema.get_type("Actor").unwrap();

        let (actors_id, actors) = schema.relationship_of(movie_id, "actors").unwrap();
        let (movies_id, movies) = schema.relationship_of(actor_id, "movies").unwrap();

        assert_eq!(actors.direction, RelationshipDirection::In);
        assert_eq!(actors.cardinality, Cardinality::Many);
        assert_eq!(actors.reverse, Some(movies_id));
        assert_eq!(movies.reverse, Some(actors_id));
        assert_eq!(movies.query_direction, QueryDirection::DefaultUndirected);

        let (_, director) = schema.relationship_of(movie_id, "director").unwrap();
        assert_eq!(director.cardinality, Cardinality::One);
        assert!(director.required);
        assert_eq!(director.nested_operations.len(), 2);
        assert_eq!(director.reverse, None);
    }

    #[test]
    fn builds_computed_fields() {
        let schema = build_from_sdl(MOVIES).unwrap();

        let FieldKind::Cypher(actor_count) = field_kind(&schema, "Movie", "actorCount") else {
            panic!("Expected a cypher field");
        };
        assert_eq!(actor_count.column_name, "c");
        assert!(matches!(
            actor_count.return_type,
            CypherReturnType::Scalar(ScalarType::Int)
        ));

        let FieldKind::Cypher(similar) = field_kind(&schema, "Movie", "similar") else {
            panic!("Expected a cypher field");
        };
        assert_eq!(similar.arguments[0].name, "limit");
        assert!(matches!(similar.return_type, CypherReturnType::Composite(_)));

        let FieldKind::CustomResolver { requires } = field_kind(&schema, "Movie", "summary")
        else {
            panic!("Expected a custom resolver");
        };
        assert_eq!(
            requires
                .iter()
                .map(|required| required.field.as_str())
                .collect::<Vec<_>>(),
            ["title", "year"]
        );
    }

    #[test]
    fn builds_root_fields() {
        let schema = build_from_sdl(MOVIES).unwrap();

        let names: Vec<_> = schema
            .root_fields
            .values()
            .filter(|root| schema.types[root.type_id].name == "Movie")
            .map(|root| (root.name.as_str(), root.operation))
            .collect();
        assert_eq!(
            names,
            [
                ("movies", RootOperation::Read),
                ("moviesAggregate", RootOperation::Aggregate),
                ("createMovies", RootOperation::Create),
                ("updateMovies", RootOperation::Update),
                ("deleteMovies", RootOperation::Delete),
            ]
        );
        assert!(schema.root_field("people").is_some());
        assert!(schema.root_field("actedIns").is_none());
    }

    #[test]
    fn interfaces_and_unions() {
        let schema = build_from_sdl(
            r#"
            interface Production {
                title: String!
                actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN)
            }
            type Movie implements Production {
                title: String!
                actors: [Actor!]!
                runtime: Int
            }
            type Series implements Production {
                title: String!
                actors: [Actor!]!
            }
            type Actor {
                name: String!
                actedIn: [Production!]! @relationship(type: "ACTED_IN", direction: OUT)
                favorite: Favorite @relationship(type: "LIKES", direction: OUT)
            }
            union Favorite = Movie | Series
            "#,
        )
        .unwrap();

        let (production_id, production) = schema.get_type("Production").unwrap();
        let TypeKind::Interface { implementations } = &production.kind else {
            panic!("Expected an interface");
        };
        assert_eq!(implementations.len(), 2);

        let (movie_id, movie) = schema.get_type("Movie").unwrap();
        assert_eq!(movie.supertypes, ["Production", "Favorite"]);

        // Implementations inherit the interface's relationship
        let (_, inherited) = schema.relationship_of(movie_id, "actors").unwrap();
        assert_eq!(inherited.rel_type, "ACTED_IN");
        assert_eq!(inherited.direction, RelationshipDirection::In);

        let (actor_id, _) = schema.get_type("Actor").unwrap();
        let (_, acted_in) = schema.relationship_of(actor_id, "actedIn").unwrap();
        assert_eq!(acted_in.target, production_id);
        assert!(acted_in.reverse.is_some());

        assert!(schema.root_field("productions").is_some());
        assert!(schema.root_field("favorites").is_some());
        assert!(schema.root_field("favoritesAggregate").is_none());
    }

    #[test]
    fn builds_authorization() {
        let schema = build_from_sdl(
            r#"
            type JWT @jwt {
                roles: [String!]! @jwtClaim(path: "app.roles")
                sub: String!
            }
            type Post @authorization(
                filter: [{ where: { node: { authorId: "$jwt.sub" } } }]
                validate: [{ operations: [UPDATE], when: [BEFORE], where: { jwt: { roles_INCLUDES: "admin" } } }]
            ) @authentication(operations: [DELETE]) {
                authorId: ID!
                secret: String @authorization(filter: [{ requireAuthentication: false, where: { node: { authorId: "x" } } }])
            }
            "#,
        )
        .unwrap();

        let jwt = schema.jwt.as_ref().unwrap();
        assert_eq!(jwt.claims[0].path, "app.roles");
        assert!(jwt.claims[0].list);

        let (_, post) = schema.get_type("Post").unwrap();
        let authorization = post.authorization.as_ref().unwrap();

        let filters: Vec<_> = authorization.filters_for(AuthOperation::Read).collect();
        assert_eq!(filters.len(), 1);
        assert!(filters[0].require_authentication);
        assert!(matches!(filters[0].predicate, AuthPredicate::Node(_)));
        assert_eq!(authorization.filters_for(AuthOperation::Create).count(), 0);

        let validations: Vec<_> = authorization
            .validations_for(AuthOperation::Update, ValidationTiming::Before)
            .collect();
        assert_eq!(validations.len(), 1);
        assert!(matches!(validations[0].predicate, AuthPredicate::Jwt(_)));
        assert_eq!(
            authorization
                .validations_for(AuthOperation::Update, ValidationTiming::After)
                .count(),
            0
        );

        assert!(post.requires_authentication(AuthOperation::Delete));
        assert!(!post.requires_authentication(AuthOperation::Read));

        let secret = post.field("secret").unwrap();
        assert!(!secret.authorization.as_ref().unwrap().filter[0].require_authentication);
    }

    fn build_error(sdl: &str) -> SchemaError {
        build_from_sdl(sdl).unwrap_err()
    }

    #[test]
    fn rejects_inconsistent_relationships() {
        let error = build_error(
            r#"
            type Movie { actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN) }
            type Actor { movies: [Movie!]! @relationship(type: "ACTED_IN", direction: IN) }
            "#,
        );
        assert!(matches!(
            error,
            SchemaError::InconsistentRelationship { ref type_name, .. } if type_name == "Movie"
        ));
    }

    #[test]
    fn rejects_alias_collisions() {
        assert_eq!(
            build_error(
                r#"type Movie { title: String, name: String @alias(property: "title") }"#
            ),
            SchemaError::AliasCollision {
                type_name: "Movie".to_string(),
                property: "title".to_string(),
            }
        );
    }

    #[test]
    fn rejects_invalid_cypher_fields() {
        assert!(matches!(
            build_error(
                r#"type Movie { similar: [Show!]! @cypher(statement: "MATCH (m) RETURN m", columnName: "m") }"#
            ),
            SchemaError::InvalidCypherField { .. }
        ));
        assert!(matches!(
            build_error(
                r#"type Movie { similar: [Movie!]! @cypher(statement: "MATCH (m) RETURN m LIMIT $n", columnName: "m") }"#
            ),
            SchemaError::InvalidCypherField { .. }
        ));
        assert!(matches!(
            build_error(r#"type Movie { count: Int @cypher(statement: "RETURN 1 AS c") }"#),
            SchemaError::InvalidCypherField { .. }
        ));
    }

    #[test]
    fn rejects_invalid_directives() {
        assert!(matches!(
            build_error(r#"type Movie { title: String @frobnicate }"#),
            SchemaError::InvalidDirective { .. }
        ));
        assert!(matches!(
            build_error(
                r#"type Movie { actors: [Actor!]! @relationship(type: "ACTED_IN", direction: SIDEWAYS) } type Actor { name: String }"#
            ),
            SchemaError::InvalidDirective { .. }
        ));
        assert!(matches!(
            build_error(r#"type Movie { actors: [Actor!]! } type Actor { name: String }"#),
            SchemaError::InvalidDirective { .. }
        ));
        assert!(matches!(
            build_error(r#"type Movie { title: String @customResolver(requires: "rating") }"#),
            SchemaError::InvalidDirective { .. }
        ));
    }

    #[test]
    fn rejects_unknown_types() {
        assert_eq!(
            build_error(r#"type Movie { rating: Rating }"#),
            SchemaError::UnknownType {
                name: "Rating".to_string(),
                referenced_by: "Movie.rating".to_string(),
            }
        );
    }

    #[test]
    fn rejects_invalid_authorization() {
        assert!(matches!(
            build_error(
                r#"type Movie @authorization(filter: [{ where: { node: { rating: 5 } } }]) { title: String }"#
            ),
            SchemaError::InvalidAuthorization { .. }
        ));
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(
            build_error("type Movie {"),
            SchemaError::Parse(_)
        ));
    }
}
