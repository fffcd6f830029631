// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A hand-assembled schema for unit tests:
//!
//! ```graphql
//! type Movie { title: String, year: Int, released: DateTime, tags: [String!],
//!              actors: [Actor!]! @relationship(type: "ACTED_IN", direction: IN, properties: "ActedIn") }
//! type Actor { name: String, movies: [Movie!]! @relationship(type: "ACTED_IN", direction: OUT),
//!              favorites: [Favorite!]! @relationship(type: "LIKES", direction: OUT) }
//! type ActedIn @relationshipProperties { role: String, screenTime: Int }
//! union Favorite = Movie | Actor
//! ```

use crate::{
    relationship::{
        Cardinality, NestedOperation, QueryDirection, RelationshipDescriptor,
        RelationshipDirection, RelationshipId,
    },
    schema::Neo4jSchema,
    types::{FieldDescriptor, FieldKind, FieldType, PropertyField, ScalarType, TypeDescriptor, TypeKind},
};

pub(crate) fn property(name: &str, scalar: ScalarType, list: bool) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        typ: FieldType {
            type_name: scalar.type_name().to_string(),
            list,
            nullable: true,
        },
        kind: FieldKind::Property(PropertyField {
            db_name: name.to_string(),
            scalar,
            autogenerate: false,
            unique: false,
            timestamp: vec![],
            default: None,
            coalesce: None,
            populated_by: None,
        }),
        authorization: None,
    }
}

fn relationship_field(name: &str, target: &str, id: usize) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        typ: FieldType {
            type_name: target.to_string(),
            list: true,
            nullable: false,
        },
        kind: FieldKind::Relationship(RelationshipId(id)),
        authorization: None,
    }
}

fn node(name: &str, plural: &str, fields: Vec<FieldDescriptor>) -> TypeDescriptor {
    TypeDescriptor {
        name: name.to_string(),
        plural: plural.to_string(),
        kind: TypeKind::Node {
            labels: vec![name.to_string()],
        },
        fields,
        supertypes: vec![],
        authorization: None,
        authentication: None,
    }
}

pub(crate) fn movie_schema() -> Neo4jSchema {
    let mut schema = Neo4jSchema::default();

    let movie = schema.types.add(
        "Movie",
        node(
            "Movie",
            "movies",
            vec![
                property("title", ScalarType::String, false),
                property("year", ScalarType::Int, false),
                property("released", ScalarType::DateTime, false),
                property("tags", ScalarType::String, true),
                relationship_field("actors", "Actor", 0),
            ],
        ),
    );
    let mut actor_type = node(
        "Actor",
        "actors",
        vec![
            property("name", ScalarType::String, false),
            relationship_field("movies", "Movie", 1),
            relationship_field("favorites", "Favorite", 2),
        ],
    );
    actor_type.supertypes = vec!["Favorite".to_string()];
    let actor = schema.types.add("Actor", actor_type);
    let acted_in = schema.types.add(
        "ActedIn",
        TypeDescriptor {
            kind: TypeKind::RelationshipProperties,
            ..node(
                "ActedIn",
                "actedIns",
                vec![
                    property("role", ScalarType::String, false),
                    property("screenTime", ScalarType::Int, false),
                ],
            )
        },
    );
    let favorite = schema.types.add(
        "Favorite",
        TypeDescriptor {
            kind: TypeKind::Union {
                members: vec![movie, actor],
            },
            ..node("Favorite", "favorites", vec![])
        },
    );
    schema.types[movie].supertypes = vec!["Favorite".to_string()];

    let relationship = |owner, field_name: &str, target, rel_type: &str, direction, properties| {
        RelationshipDescriptor {
            owner,
            field_name: field_name.to_string(),
            target,
            rel_type: rel_type.to_string(),
            direction,
            cardinality: Cardinality::Many,
            required: false,
            properties,
            nested_operations: NestedOperation::ALL.to_vec(),
            aggregate: true,
            query_direction: QueryDirection::DefaultDirected,
            reverse: None,
        }
    };

    schema.relationships = vec![
        RelationshipDescriptor {
            reverse: Some(RelationshipId(1)),
            ..relationship(
                movie,
                "actors",
                actor,
                "ACTED_IN",
                RelationshipDirection::In,
                Some(acted_in),
            )
        },
        RelationshipDescriptor {
            reverse: Some(RelationshipId(0)),
            ..relationship(
                actor,
                "movies",
                movie,
                "ACTED_IN",
                RelationshipDirection::Out,
                Some(acted_in),
            )
        },
        relationship(
            actor,
            "favorites",
            favorite,
            "LIKES",
            RelationshipDirection::Out,
            None,
        ),
    ];

    schema
}
