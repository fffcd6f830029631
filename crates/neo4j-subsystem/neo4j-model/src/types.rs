// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use common::value::Val;
use core_model::mapped_arena::SerializableSlabIndex;

use crate::access::{AuthOperation, AuthenticationAnnotation, AuthorizationAnnotation};
use crate::relationship::RelationshipId;

pub type TypeId = SerializableSlabIndex<TypeDescriptor>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    /// Lower camel case plural used for root fields (`Movie` -> `movies`)
    pub plural: String,
    pub kind: TypeKind,
    pub fields: Vec<FieldDescriptor>,
    /// Interfaces this type implements (and unions it is a member of)
    pub supertypes: Vec<String>,
    pub authorization: Option<AuthorizationAnnotation>,
    pub authentication: Option<AuthenticationAnnotation>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum TypeKind {
    Node { labels: Vec<String> },
    Interface { implementations: Vec<TypeId> },
    Union { members: Vec<TypeId> },
    /// Properties stored on a relationship (`@relationshipProperties`)
    RelationshipProperties,
}

impl TypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn labels(&self) -> &[String] {
        match &self.kind {
            TypeKind::Node { labels } => labels,
            _ => &[],
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind, TypeKind::Node { .. })
    }

    pub fn is_abstract(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Interface { .. } | TypeKind::Union { .. }
        )
    }

    pub fn requires_authentication(&self, operation: AuthOperation) -> bool {
        self.authentication
            .as_ref()
            .is_some_and(|authentication| authentication.applies_to(operation))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub typ: FieldType,
    pub kind: FieldKind,
    pub authorization: Option<AuthorizationAnnotation>,
}

impl FieldDescriptor {
    pub fn property(&self) -> Option<&PropertyField> {
        match &self.kind {
            FieldKind::Property(property) => Some(property),
            _ => None,
        }
    }

    pub fn relationship(&self) -> Option<RelationshipId> {
        match &self.kind {
            FieldKind::Relationship(id) => Some(*id),
            _ => None,
        }
    }
}

/// The declared GraphQL type of a field
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub type_name: String,
    pub list: bool,
    pub nullable: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum FieldKind {
    Property(PropertyField),
    Relationship(RelationshipId),
    Cypher(CypherField),
    /// Resolved outside the graph; the listed selections must be fetched for it
    CustomResolver { requires: Vec<RequiredSelection> },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ScalarType {
    Id,
    String,
    Int,
    BigInt,
    Float,
    Boolean,
    DateTime,
    LocalDateTime,
    Date,
    Time,
    LocalTime,
    Duration,
    Enum(String),
    /// A declared custom scalar, passed through untouched
    Custom(String),
}

impl ScalarType {
    pub fn from_type_name(name: &str) -> Option<ScalarType> {
        Some(match name {
            "ID" => ScalarType::Id,
            "String" => ScalarType::String,
            "Int" => ScalarType::Int,
            "BigInt" => ScalarType::BigInt,
            "Float" => ScalarType::Float,
            "Boolean" => ScalarType::Boolean,
            "DateTime" => ScalarType::DateTime,
            "LocalDateTime" => ScalarType::LocalDateTime,
            "Date" => ScalarType::Date,
            "Time" => ScalarType::Time,
            "LocalTime" => ScalarType::LocalTime,
            "Duration" => ScalarType::Duration,
            _ => return None,
        })
    }

    /// Name as written in the schema
    pub fn type_name(&self) -> &str {
        match self {
            ScalarType::Id => "ID",
            ScalarType::String => "String",
            ScalarType::Int => "Int",
            ScalarType::BigInt => "BigInt",
            ScalarType::Float => "Float",
            ScalarType::Boolean => "Boolean",
            ScalarType::DateTime => "DateTime",
            ScalarType::LocalDateTime => "LocalDateTime",
            ScalarType::Date => "Date",
            ScalarType::Time => "Time",
            ScalarType::LocalTime => "LocalTime",
            ScalarType::Duration => "Duration",
            ScalarType::Enum(name) | ScalarType::Custom(name) => name,
        }
    }

    /// The Cypher function that constructs a value of this temporal type from a string
    pub fn temporal_function(&self) -> Option<&'static str> {
        match self {
            ScalarType::DateTime => Some("datetime"),
            ScalarType::LocalDateTime => Some("localdatetime"),
            ScalarType::Date => Some("date"),
            ScalarType::Time => Some("time"),
            ScalarType::LocalTime => Some("localtime"),
            ScalarType::Duration => Some("duration"),
            _ => None,
        }
    }

    pub fn is_temporal(&self) -> bool {
        self.temporal_function().is_some()
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::BigInt)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, ScalarType::Float)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ScalarType::String | ScalarType::Id)
    }

    /// Can values be ordered with `<`, `>`, etc.?
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || self.is_temporal() || self.is_textual()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Create,
    Update,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PropertyField {
    /// Name of the property in the database (differs from the field name with `@alias`)
    pub db_name: String,
    pub scalar: ScalarType,
    /// `@id(autogenerate: true)`: `randomUUID()` on create
    pub autogenerate: bool,
    pub unique: bool,
    /// Operations for which `@timestamp` sets the value
    pub timestamp: Vec<WriteOperation>,
    pub default: Option<Val>,
    pub coalesce: Option<Val>,
    pub populated_by: Option<PopulatedBy>,
}

impl PropertyField {
    pub fn is_server_generated(&self) -> bool {
        self.autogenerate || !self.timestamp.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PopulatedBy {
    pub callback: String,
    pub operations: Vec<WriteOperation>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CypherField {
    pub statement: String,
    pub column_name: String,
    pub arguments: Vec<CypherArgument>,
    pub return_type: CypherReturnType,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CypherArgument {
    pub name: String,
    pub scalar: Option<ScalarType>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum CypherReturnType {
    Scalar(ScalarType),
    Composite(TypeId),
}

/// One field named in `@customResolver(requires: "...")`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequiredSelection {
    pub field: String,
    pub subfields: Vec<RequiredSelection>,
}
