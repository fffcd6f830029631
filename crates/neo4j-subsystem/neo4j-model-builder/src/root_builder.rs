// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use neo4j_model::{
    root::{RootField, RootOperation},
    schema::Neo4jSchema,
    types::TypeKind,
};

use crate::{error::SchemaError, naming::ToPlural};

/// Populate the root field dispatch table:
/// - node types get `<plural>`, `<plural>Aggregate`, `create<Plural>`, `update<Plural>`,
///   `delete<Plural>`
/// - interfaces get `<plural>` and `<plural>Aggregate`
/// - unions get `<plural>`
pub(crate) fn build_root_fields(schema: &mut Neo4jSchema) -> Result<(), SchemaError> {
    let mut root_fields = vec![];

    for (type_id, typ) in schema.types.iter() {
        let plural = &typ.plural;
        let upper_plural = typ.name.to_upper_plural();

        let operations = match typ.kind {
            TypeKind::Node { .. } => vec![
                (plural.clone(), RootOperation::Read),
                (format!("{plural}Aggregate"), RootOperation::Aggregate),
                (format!("create{upper_plural}"), RootOperation::Create),
                (format!("update{upper_plural}"), RootOperation::Update),
                (format!("delete{upper_plural}"), RootOperation::Delete),
            ],
            TypeKind::Interface { .. } => vec![
                (plural.clone(), RootOperation::Read),
                (format!("{plural}Aggregate"), RootOperation::Aggregate),
            ],
            TypeKind::Union { .. } => vec![(plural.clone(), RootOperation::Read)],
            TypeKind::RelationshipProperties => vec![],
        };

        for (name, operation) in operations {
            root_fields.push(RootField {
                name,
                type_id,
                operation,
            });
        }
    }

    for root_field in root_fields {
        if let Some(existing) = schema.root_fields.get(&root_field.name) {
            return Err(SchemaError::Generic(format!(
                "Root field '{}' is defined by both '{}' and '{}'",
                root_field.name,
                schema.types[existing.type_id].name,
                schema.types[root_field.type_id].name
            )));
        }
        schema
            .root_fields
            .insert(root_field.name.clone(), root_field);
    }

    Ok(())
}
