// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use async_graphql_parser::{
    parse_query,
    types::{BaseType, DocumentOperations, Selection, SelectionSet, Type},
};

use exo_cypher::Template;
use neo4j_model::{
    relationship::{
        Cardinality, NestedOperation, QueryDirection, RelationshipDescriptor,
        RelationshipDirection, RelationshipId,
    },
    types::{
        CypherArgument, CypherField, CypherReturnType, FieldDescriptor, FieldKind, FieldType,
        PopulatedBy, PropertyField, RequiredSelection, ScalarType, TypeId, TypeKind,
        WriteOperation,
    },
};

use crate::{
    directives::{Directive, Directives, FIELD_DIRECTIVES},
    error::SchemaError,
    type_builder::{EffectiveField, SchemaBuilding},
};

/// Cypher parameters available to every `@cypher` statement besides the field arguments
const CYPHER_BUILTIN_PARAMETERS: [&str; 1] = ["jwt"];

/// Build the fields of every node, interface and relationship-properties type
pub(crate) fn build_expanded(building: &mut SchemaBuilding) -> Result<(), SchemaError> {
    let type_ids: Vec<(TypeId, String)> = building
        .schema
        .types
        .iter()
        .map(|(id, typ)| (id, typ.name.clone()))
        .collect();

    for (type_id, type_name) in type_ids {
        if matches!(building.schema.types[type_id].kind, TypeKind::Union { .. }) {
            continue;
        }

        let mut fields = vec![];
        for field in building.effective_fields(&type_name) {
            fields.push(build_field(building, type_id, &type_name, &field)?);
        }
        check_alias_collisions(&type_name, &fields)?;

        building.schema.types[type_id].fields = fields;
    }

    Ok(())
}

fn build_field(
    building: &mut SchemaBuilding,
    type_id: TypeId,
    type_name: &str,
    field: &EffectiveField,
) -> Result<FieldDescriptor, SchemaError> {
    let field_name = field.definition.name.node.as_str();
    let directives = Directives::new(field.directives, type_name, Some(field_name));
    directives.check_known(&FIELD_DIRECTIVES)?;

    let typ = field_type(&field.definition.ty.node).ok_or_else(|| {
        SchemaError::Generic(format!(
            "Nested lists are not supported ({type_name}.{field_name})"
        ))
    })?;
    let is_relationship_properties = matches!(
        building.schema.types[type_id].kind,
        TypeKind::RelationshipProperties
    );

    let kind = if let Some(relationship) = directives.get("relationship") {
        if is_relationship_properties {
            return Err(relationship.error("relationship properties cannot declare relationships"));
        }
        FieldKind::Relationship(build_relationship(
            building, type_id, field_name, &typ, &relationship,
        )?)
    } else if let Some(cypher) = directives.get("cypher") {
        FieldKind::Cypher(build_cypher_field(
            building, type_name, field, &typ, &cypher,
        )?)
    } else if let Some(custom_resolver) = directives.get("customResolver") {
        let requires = match custom_resolver.string("requires")? {
            Some(requires) => {
                parse_requires(&requires).map_err(|message| custom_resolver.error(message))?
            }
            None => vec![],
        };
        FieldKind::CustomResolver { requires }
    } else {
        let scalar = building.scalar_type(&typ.type_name);
        match scalar {
            Some(scalar) => {
                FieldKind::Property(build_property(field_name, scalar, &directives)?)
            }
            None if building.type_id(&typ.type_name).is_some() => {
                return Err(directives.error(
                    "relationship",
                    "object fields require @relationship, @cypher or @customResolver",
                ));
            }
            None => {
                return Err(SchemaError::UnknownType {
                    name: typ.type_name.clone(),
                    referenced_by: format!("{type_name}.{field_name}"),
                });
            }
        }
    };

    Ok(FieldDescriptor {
        name: field_name.to_string(),
        typ,
        kind,
        authorization: None,
    })
}

/// `[String!]!` -> (String, list, non-null)
pub(crate) fn field_type(typ: &Type) -> Option<FieldType> {
    match &typ.base {
        BaseType::Named(name) => Some(FieldType {
            type_name: name.to_string(),
            list: false,
            nullable: typ.nullable,
        }),
        BaseType::List(inner) => match &inner.base {
            BaseType::Named(name) => Some(FieldType {
                type_name: name.to_string(),
                list: true,
                nullable: typ.nullable,
            }),
            BaseType::List(_) => None,
        },
    }
}

fn write_operation(name: &str) -> Option<WriteOperation> {
    match name {
        "CREATE" => Some(WriteOperation::Create),
        "UPDATE" => Some(WriteOperation::Update),
        _ => None,
    }
}

fn build_property(
    field_name: &str,
    scalar: ScalarType,
    directives: &Directives,
) -> Result<PropertyField, SchemaError> {
    let both = [WriteOperation::Create, WriteOperation::Update];

    let db_name = match directives.get("alias") {
        Some(alias) => alias.required_string("property")?,
        None => field_name.to_string(),
    };

    let (autogenerate, mut unique) = match directives.get("id") {
        Some(id) => {
            let autogenerate = id.boolean("autogenerate", true)?;
            if autogenerate && scalar != ScalarType::Id {
                return Err(id.error("only ID fields can be autogenerated"));
            }
            (autogenerate, id.boolean("unique", true)?)
        }
        None => (false, false),
    };
    unique |= directives.has("unique");

    let timestamp = match directives.get("timestamp") {
        Some(timestamp) => {
            if !scalar.is_temporal()
                || matches!(
                    scalar,
                    ScalarType::Duration
                        | ScalarType::Date
                )
            {
                return Err(timestamp.error(
                    "timestamps apply to DateTime, LocalDateTime, Time and LocalTime fields",
                ));
            }
            timestamp.enum_list_with("operations", &both, write_operation)?
        }
        None => vec![],
    };

    let default = directives
        .get("default")
        .map(|default| {
            default
                .value("value")?
                .ok_or_else(|| default.error("missing argument 'value'"))
        })
        .transpose()?;
    let coalesce = directives
        .get("coalesce")
        .map(|coalesce| {
            coalesce
                .value("value")?
                .ok_or_else(|| coalesce.error("missing argument 'value'"))
        })
        .transpose()?;

    let populated_by = directives
        .get("populatedBy")
        .map(|populated_by| {
            Ok::<_, SchemaError>(PopulatedBy {
                callback: populated_by.required_string("callback")?,
                operations: populated_by.enum_list_with("operations", &both, write_operation)?,
            })
        })
        .transpose()?;

    Ok(PropertyField {
        db_name,
        scalar,
        autogenerate,
        unique,
        timestamp,
        default,
        coalesce,
        populated_by,
    })
}

fn build_relationship(
    building: &mut SchemaBuilding,
    owner: TypeId,
    field_name: &str,
    typ: &FieldType,
    directive: &Directive,
) -> Result<RelationshipId, SchemaError> {
    let owner_name = building.schema.types[owner].name.clone();

    let target = building
        .type_id(&typ.type_name)
        .filter(|id| {
            !matches!(
                building.schema.types[*id].kind,
                TypeKind::RelationshipProperties
            )
        })
        .ok_or_else(|| SchemaError::UnknownType {
            name: typ.type_name.clone(),
            referenced_by: format!("{owner_name}.{field_name}"),
        })?;

    let rel_type = directive.required_string("type")?;
    let direction = match directive.enum_value("direction")?.as_deref() {
        Some("IN") => RelationshipDirection::In,
        Some("OUT") => RelationshipDirection::Out,
        Some(other) => return Err(directive.error(format!("invalid direction '{other}'"))),
        None => return Err(directive.error("missing argument 'direction'")),
    };

    let properties = match directive.string("properties")? {
        Some(properties) => {
            let properties_id =
                building
                    .type_id(&properties)
                    .ok_or_else(|| SchemaError::UnknownType {
                        name: properties.clone(),
                        referenced_by: format!("{owner_name}.{field_name}"),
                    })?;
            if !matches!(
                building.schema.types[properties_id].kind,
                TypeKind::RelationshipProperties
            ) {
                return Err(directive.error(format!(
                    "'{properties}' is not marked with @relationshipProperties"
                )));
            }
            Some(properties_id)
        }
        None => None,
    };

    let query_direction = match directive.enum_value("queryDirection")?.as_deref() {
        None | Some("DEFAULT_DIRECTED") => QueryDirection::DefaultDirected,
        Some("DEFAULT_UNDIRECTED") => QueryDirection::DefaultUndirected,
        Some("DIRECTED_ONLY") => QueryDirection::DirectedOnly,
        Some("UNDIRECTED_ONLY") => QueryDirection::UndirectedOnly,
        Some(other) => return Err(directive.error(format!("invalid queryDirection '{other}'"))),
    };

    let nested_operations =
        directive.enum_list_with("nestedOperations", &NestedOperation::ALL, |name| {
            Some(match name {
                "CREATE" => NestedOperation::Create,
                "CONNECT" => NestedOperation::Connect,
                "UPDATE" => NestedOperation::Update,
                "DELETE" => NestedOperation::Delete,
                "DISCONNECT" => NestedOperation::Disconnect,
                "CONNECT_OR_CREATE" => NestedOperation::ConnectOrCreate,
                _ => return None,
            })
        })?;

    let id = RelationshipId(building.schema.relationships.len());
    building.schema.relationships.push(RelationshipDescriptor {
        owner,
        field_name: field_name.to_string(),
        target,
        rel_type,
        direction,
        cardinality: if typ.list {
            Cardinality::Many
        } else {
            Cardinality::One
        },
        required: !typ.list && !typ.nullable,
        properties,
        nested_operations,
        aggregate: directive.boolean("aggregate", true)?,
        query_direction,
        reverse: None,
    });

    Ok(id)
}

fn build_cypher_field(
    building: &SchemaBuilding,
    type_name: &str,
    field: &EffectiveField,
    typ: &FieldType,
    directive: &Directive,
) -> Result<CypherField, SchemaError> {
    let field_name = field.definition.name.node.as_str();
    let invalid = |message: String| SchemaError::InvalidCypherField {
        type_name: type_name.to_string(),
        field_name: field_name.to_string(),
        message,
    };

    let statement = directive
        .string("statement")?
        .ok_or_else(|| invalid("missing 'statement'".to_string()))?;
    let column_name = directive
        .string("columnName")?
        .ok_or_else(|| invalid("missing 'columnName'".to_string()))?;

    let return_type = match building.scalar_type(&typ.type_name) {
        Some(scalar) => CypherReturnType::Scalar(scalar),
        None => match building.type_id(&typ.type_name) {
            Some(id)
                if !matches!(
                    building.schema.types[id].kind,
                    TypeKind::RelationshipProperties
                ) =>
            {
                CypherReturnType::Composite(id)
            }
            _ => {
                return Err(invalid(format!(
                    "returns undefined type '{}'",
                    typ.type_name
                )));
            }
        },
    };

    let arguments: Vec<CypherArgument> = field
        .definition
        .arguments
        .iter()
        .map(|argument| {
            let argument = &argument.node;
            CypherArgument {
                name: argument.name.node.to_string(),
                scalar: field_type(&argument.ty.node)
                    .and_then(|typ| building.scalar_type(&typ.type_name)),
            }
        })
        .collect();

    for parameter in Template::parameter_names(&statement) {
        let known = CYPHER_BUILTIN_PARAMETERS.contains(&parameter.as_str())
            || arguments.iter().any(|argument| argument.name == parameter);
        if !known {
            return Err(invalid(format!("unknown parameter '${parameter}'")));
        }
    }

    Ok(CypherField {
        statement,
        column_name,
        arguments,
        return_type,
    })
}

/// Parse a `requires` selection such as `"title actors { name }"`
fn parse_requires(requires: &str) -> Result<Vec<RequiredSelection>, String> {
    let document = parse_query(format!("{{ {requires} }}"))
        .map_err(|error| format!("'requires' does not parse: {error}"))?;

    match &document.operations {
        DocumentOperations::Single(operation) => {
            required_selections(&operation.node.selection_set.node)
        }
        DocumentOperations::Multiple(_) => Err("'requires' must be a selection set".to_string()),
    }
}

fn required_selections(selection_set: &SelectionSet) -> Result<Vec<RequiredSelection>, String> {
    selection_set
        .items
        .iter()
        .map(|selection| match &selection.node {
            Selection::Field(field) => Ok(RequiredSelection {
                field: field.node.name.node.to_string(),
                subfields: required_selections(&field.node.selection_set.node)?,
            }),
            _ => Err("fragments are not supported in 'requires'".to_string()),
        })
        .collect()
}

/// Check that every required selection names a field the graph can provide
pub(crate) fn validate_requires(building: &SchemaBuilding) -> Result<(), SchemaError> {
    for (type_id, typ) in building.schema.types.iter() {
        for field in &typ.fields {
            if let FieldKind::CustomResolver { requires } = &field.kind {
                check_required(building, type_id, requires).map_err(|message| {
                    SchemaError::invalid_directive(
                        &typ.name,
                        Some(&field.name),
                        "customResolver",
                        message,
                    )
                })?;
            }
        }
    }
    Ok(())
}

fn check_required(
    building: &SchemaBuilding,
    type_id: TypeId,
    requires: &[RequiredSelection],
) -> Result<(), String> {
    let typ = &building.schema.types[type_id];

    for required in requires {
        if required.field == "__typename" {
            continue;
        }
        let field = typ
            .field(&required.field)
            .ok_or_else(|| format!("unknown field '{}' in 'requires'", required.field))?;

        match &field.kind {
            FieldKind::CustomResolver { .. } => {
                return Err(format!(
                    "'{}' is itself resolved by a custom resolver",
                    required.field
                ));
            }
            FieldKind::Relationship(relationship) => {
                if required.subfields.is_empty() {
                    return Err(format!("'{}' needs a selection", required.field));
                }
                let target = building.schema.relationship(*relationship).target;
                // Unions declare no fields of their own
                if !matches!(building.schema.types[target].kind, TypeKind::Union { .. }) {
                    check_required(building, target, &required.subfields)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

pub(crate) fn check_alias_collisions(
    type_name: &str,
    fields: &[FieldDescriptor],
) -> Result<(), SchemaError> {
    let mut properties = HashMap::new();

    for field in fields {
        if let Some(property) = field.property() {
            if properties
                .insert(property.db_name.as_str(), field.name.as_str())
                .is_some()
            {
                return Err(SchemaError::AliasCollision {
                    type_name: type_name.to_string(),
                    property: property.db_name.clone(),
                });
            }
        }
    }

    Ok(())
}
