// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use core_model::mapped_arena::MappedArena;

use crate::{
    relationship::{RelationshipDescriptor, RelationshipId},
    root::RootField,
    types::{ScalarType, TypeDescriptor, TypeId, TypeKind},
};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Neo4jSchema {
    pub types: MappedArena<TypeDescriptor>,
    pub relationships: Vec<RelationshipDescriptor>,
    pub root_fields: IndexMap<String, RootField>,
    pub jwt: Option<JwtDescriptor>,
}

/// The shape of the JWT payload declared with `@jwt`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JwtDescriptor {
    pub claims: Vec<JwtClaimField>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JwtClaimField {
    pub name: String,
    /// Path into the claims (`@jwtClaim(path:)`), the field name by default
    pub path: String,
    pub scalar: ScalarType,
    pub list: bool,
}

impl Neo4jSchema {
    pub fn get_type(&self, name: &str) -> Option<(TypeId, &TypeDescriptor)> {
        self.types.get_id(name).map(|id| (id, &self.types[id]))
    }

    pub fn relationship(&self, id: RelationshipId) -> &RelationshipDescriptor {
        &self.relationships[id.0]
    }

    pub fn root_field(&self, name: &str) -> Option<&RootField> {
        self.root_fields.get(name)
    }

    /// The relationship declared by a field of a type
    pub fn relationship_of(
        &self,
        type_id: TypeId,
        field_name: &str,
    ) -> Option<(RelationshipId, &RelationshipDescriptor)> {
        self.types[type_id]
            .field(field_name)
            .and_then(|field| field.relationship())
            .map(|id| (id, self.relationship(id)))
    }

    /// Node types a value of the given type can be: itself for a node, implementations of an
    /// interface, members of a union.
    pub fn concrete_types(&self, type_id: TypeId) -> Vec<TypeId> {
        match &self.types[type_id].kind {
            TypeKind::Node { .. } | TypeKind::RelationshipProperties => vec![type_id],
            TypeKind::Interface { implementations } => implementations.clone(),
            TypeKind::Union { members } => members.clone(),
        }
    }

    /// Names of the abstract types a concrete type belongs to (for fragment type conditions)
    pub fn supertypes(&self, type_id: TypeId) -> Vec<&str> {
        self.types[type_id]
            .supertypes
            .iter()
            .map(|name| name.as_str())
            .collect()
    }

    pub fn jwt_claim(&self, name: &str) -> Option<&JwtClaimField> {
        self.jwt
            .as_ref()
            .and_then(|jwt| jwt.claims.iter().find(|claim| claim.name == name))
    }
}
