// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Build types in two passes: first every type with its kind but no fields (so that fields can
//! refer to any type regardless of declaration order), then the fields.

use std::collections::HashSet;

use async_graphql_parser::{
    Positioned,
    types::{
        ConstDirective, FieldDefinition, ServiceDocument, TypeDefinition,
        TypeKind as SdlTypeKind, TypeSystemDefinition,
    },
};
use indexmap::IndexMap;

use neo4j_model::{
    schema::Neo4jSchema,
    types::{ScalarType, TypeDescriptor, TypeId, TypeKind},
};

use crate::{
    directives::{Directives, TYPE_DIRECTIVES},
    error::SchemaError,
    naming::ToPlural,
};

const RESERVED_TYPE_NAMES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// Everything collected from the document, along with the schema being built
pub(crate) struct SchemaBuilding<'a> {
    pub schema: Neo4jSchema,
    /// Definitions of the types in `schema.types`, by type name
    pub definitions: IndexMap<String, &'a TypeDefinition>,
    pub enums: HashSet<String>,
    pub scalars: HashSet<String>,
    pub input_types: HashSet<String>,
    pub jwt_definition: Option<&'a TypeDefinition>,
}

impl<'a> SchemaBuilding<'a> {
    /// The scalar type for a field or argument type name, if it is one
    pub fn scalar_type(&self, name: &str) -> Option<ScalarType> {
        ScalarType::from_type_name(name).or_else(|| {
            if self.enums.contains(name) {
                Some(ScalarType::Enum(name.to_string()))
            } else if self.scalars.contains(name) {
                Some(ScalarType::Custom(name.to_string()))
            } else {
                None
            }
        })
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.schema.types.get_id(name)
    }

    /// Field definitions of a type, including the fields inherited from its interfaces.
    ///
    /// An implementation that redeclares an interface field without any directive takes the
    /// interface's directives (typically `@relationship`).
    pub fn effective_fields(&self, type_name: &str) -> Vec<EffectiveField<'a>> {
        let Some(definition) = self.definitions.get(type_name).copied() else {
            return vec![];
        };

        let (own_fields, interfaces): (&[_], Vec<&'a TypeDefinition>) = match &definition.kind {
            SdlTypeKind::Object(object) => (
                &object.fields,
                object
                    .implements
                    .iter()
                    .filter_map(|name| self.definitions.get(name.node.as_str()).copied())
                    .collect(),
            ),
            SdlTypeKind::Interface(interface) => (
                &interface.fields,
                interface
                    .implements
                    .iter()
                    .filter_map(|name| self.definitions.get(name.node.as_str()).copied())
                    .collect(),
            ),
            _ => (&[], vec![]),
        };

        let interface_fields: Vec<&'a FieldDefinition> = interfaces
            .iter()
            .flat_map(|interface| match &interface.kind {
                SdlTypeKind::Interface(interface) => interface
                    .fields
                    .iter()
                    .map(|field| &field.node)
                    .collect::<Vec<_>>(),
                _ => vec![],
            })
            .collect();

        let mut fields: Vec<EffectiveField<'a>> = own_fields
            .iter()
            .map(|field| {
                let field = &field.node;
                let directives = if field.directives.is_empty() {
                    interface_fields
                        .iter()
                        .find(|inherited| inherited.name.node == field.name.node)
                        .map(|inherited| inherited.directives.as_slice())
                        .unwrap_or(field.directives.as_slice())
                } else {
                    field.directives.as_slice()
                };
                EffectiveField {
                    definition: field,
                    directives,
                }
            })
            .collect();

        for inherited in interface_fields {
            if !fields
                .iter()
                .any(|field| field.definition.name.node == inherited.name.node)
            {
                fields.push(EffectiveField {
                    definition: inherited,
                    directives: inherited.directives.as_slice(),
                });
            }
        }

        fields
    }
}

pub(crate) struct EffectiveField<'a> {
    pub definition: &'a FieldDefinition,
    pub directives: &'a [Positioned<ConstDirective>],
}

/// Create every type without fields, resolving interface implementations and union members
pub(crate) fn build_shallow(document: &ServiceDocument) -> Result<SchemaBuilding<'_>, SchemaError> {
    let mut building = SchemaBuilding {
        schema: Neo4jSchema::default(),
        definitions: IndexMap::new(),
        enums: HashSet::new(),
        scalars: HashSet::new(),
        input_types: HashSet::new(),
        jwt_definition: None,
    };
    let mut seen = HashSet::new();

    for definition in &document.definitions {
        let TypeSystemDefinition::Type(definition) = definition else {
            // Schema and directive definitions carry nothing the model needs
            continue;
        };
        let definition = &definition.node;
        let name = definition.name.node.to_string();

        if definition.extend {
            return Err(SchemaError::Generic(format!(
                "Type extensions are not supported ('{name}')"
            )));
        }
        if RESERVED_TYPE_NAMES.contains(&name.as_str()) {
            return Err(SchemaError::Generic(format!(
                "Custom root types are not supported ('{name}')"
            )));
        }
        if ScalarType::from_type_name(&name).is_some() || !seen.insert(name.clone()) {
            return Err(SchemaError::Generic(format!(
                "Type '{name}' is defined more than once"
            )));
        }

        let directives = Directives::new(&definition.directives, &name, None);
        directives.check_known(&TYPE_DIRECTIVES)?;

        let kind = match &definition.kind {
            SdlTypeKind::Scalar => {
                building.scalars.insert(name);
                continue;
            }
            SdlTypeKind::Enum(_) => {
                building.enums.insert(name);
                continue;
            }
            SdlTypeKind::InputObject(_) => {
                building.input_types.insert(name);
                continue;
            }
            SdlTypeKind::Object(_) if directives.has("jwt") => {
                if building.jwt_definition.is_some() {
                    return Err(directives.error("jwt", "only one type may be marked with @jwt"));
                }
                building.jwt_definition = Some(definition);
                continue;
            }
            SdlTypeKind::Object(_) | SdlTypeKind::Interface(_)
                if directives.has("relationshipProperties") =>
            {
                TypeKind::RelationshipProperties
            }
            SdlTypeKind::Object(_) => {
                let labels = match directives.get("node") {
                    Some(node) => node
                        .string_list("labels")?
                        .unwrap_or_else(|| vec![name.clone()]),
                    None => vec![name.clone()],
                };
                if labels.is_empty() {
                    return Err(directives.error("node", "at least one label is required"));
                }
                TypeKind::Node { labels }
            }
            SdlTypeKind::Interface(_) => TypeKind::Interface {
                implementations: vec![],
            },
            SdlTypeKind::Union(_) => TypeKind::Union { members: vec![] },
        };

        if directives.has("node") && !matches!(kind, TypeKind::Node { .. }) {
            return Err(directives.error("node", "only object types can be nodes"));
        }

        building.schema.types.add(
            &name,
            TypeDescriptor {
                plural: name.to_plural(),
                name: name.clone(),
                kind,
                fields: vec![],
                supertypes: vec![],
                authorization: None,
                authentication: None,
            },
        );
        building.definitions.insert(name, definition);
    }

    resolve_abstract_types(&mut building)?;

    Ok(building)
}

fn resolve_abstract_types(building: &mut SchemaBuilding) -> Result<(), SchemaError> {
    let definitions: Vec<(String, &TypeDefinition)> = building
        .definitions
        .iter()
        .map(|(name, definition)| (name.clone(), *definition))
        .collect();

    for (name, definition) in definitions {
        let Some(type_id) = building.type_id(&name) else {
            continue;
        };

        match &definition.kind {
            SdlTypeKind::Object(object) if building.schema.types[type_id].is_node() => {
                for interface_name in &object.implements {
                    let interface_name = interface_name.node.as_str();
                    let interface_id = building
                        .type_id(interface_name)
                        .filter(|id| {
                            matches!(
                                building.schema.types[*id].kind,
                                TypeKind::Interface { .. }
                            )
                        })
                        .ok_or_else(|| SchemaError::UnknownType {
                            name: interface_name.to_string(),
                            referenced_by: format!("the implements clause of '{name}'"),
                        })?;

                    if let TypeKind::Interface { implementations } =
                        &mut building.schema.types[interface_id].kind
                    {
                        implementations.push(type_id);
                    }
                    building.schema.types[type_id]
                        .supertypes
                        .push(interface_name.to_string());
                }
            }
            SdlTypeKind::Union(union) => {
                let mut members = vec![];
                for member_name in &union.members {
                    let member_name = member_name.node.as_str();
                    let member_id = building
                        .type_id(member_name)
                        .filter(|id| building.schema.types[*id].is_node())
                        .ok_or_else(|| SchemaError::UnknownType {
                            name: member_name.to_string(),
                            referenced_by: format!("union '{name}'"),
                        })?;
                    members.push(member_id);
                    building.schema.types[member_id]
                        .supertypes
                        .push(name.clone());
                }
                building.schema.types[type_id].kind = TypeKind::Union { members };
            }
            _ => {}
        }
    }

    Ok(())
}
