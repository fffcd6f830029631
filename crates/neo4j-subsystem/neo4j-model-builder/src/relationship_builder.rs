// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Pair each relationship with the field declaring it from the other end.

use neo4j_model::{
    relationship::{RelationshipDescriptor, RelationshipId},
    schema::Neo4jSchema,
    types::TypeId,
};

use crate::error::SchemaError;

pub(crate) fn resolve_counterparts(schema: &mut Neo4jSchema) -> Result<(), SchemaError> {
    let reverses = (0..schema.relationships.len())
        .map(|index| counterpart(schema, RelationshipId(index)))
        .collect::<Result<Vec<_>, _>>()?;

    for (relationship, reverse) in schema.relationships.iter_mut().zip(reverses) {
        relationship.reverse = reverse;
    }

    Ok(())
}

/// Does a relationship ending at `target` arrive at the given type?
fn points_at(schema: &Neo4jSchema, target: TypeId, typ: TypeId) -> bool {
    target == typ || schema.concrete_types(target).contains(&typ)
}

fn counterpart(
    schema: &Neo4jSchema,
    id: RelationshipId,
) -> Result<Option<RelationshipId>, SchemaError> {
    let relationship = schema.relationship(id);
    let self_relationship = relationship.owner == relationship.target;

    let mut endpoints = schema.concrete_types(relationship.target);
    if !endpoints.contains(&relationship.target) {
        endpoints.push(relationship.target);
    }

    let candidates: Vec<(RelationshipId, &RelationshipDescriptor)> = schema
        .relationships
        .iter()
        .enumerate()
        .map(|(index, candidate)| (RelationshipId(index), candidate))
        .filter(|(candidate_id, candidate)| {
            *candidate_id != id
                && candidate.rel_type == relationship.rel_type
                && endpoints.contains(&candidate.owner)
                && points_at(schema, candidate.target, relationship.owner)
                && (!self_relationship || candidate.direction != relationship.direction)
        })
        .collect();

    if candidates.is_empty() {
        return Ok(None);
    }

    let inconsistent = |message: String| SchemaError::InconsistentRelationship {
        type_name: schema.types[relationship.owner].name.clone(),
        field_name: relationship.field_name.clone(),
        message,
    };

    let (reverse_id, reverse) = candidates
        .iter()
        .find(|(_, candidate)| candidate.direction == relationship.direction.reversed())
        .ok_or_else(|| {
            let (_, candidate) = candidates[0];
            inconsistent(format!(
                "{}.{} declares '{}' in the same direction",
                schema.types[candidate.owner].name, candidate.field_name, relationship.rel_type
            ))
        })?;

    if let (Some(properties), Some(reverse_properties)) =
        (relationship.properties, reverse.properties)
    {
        if properties != reverse_properties {
            return Err(inconsistent(format!(
                "{}.{} uses properties '{}' instead of '{}'",
                schema.types[reverse.owner].name,
                reverse.field_name,
                schema.types[reverse_properties].name,
                schema.types[properties].name
            )));
        }
    }

    Ok(Some(*reverse_id))
}
