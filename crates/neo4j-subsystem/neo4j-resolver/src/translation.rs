// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::cell::OnceCell;

use exo_cypher::{
    Direction, Expression, IdentifierScope, NodePattern, Param, Pattern, Predicate,
    RelationshipPattern, Variable,
};
use neo4j_model::{
    relationship::{RelationshipDescriptor, RelationshipDirection, RelationshipId},
    schema::Neo4jSchema,
    types::{TypeDescriptor, TypeId},
};

use crate::{
    cast::val_to_cypher, config::TranslatorConfig, context::TranslationContext,
    neo4j_execution_error::Neo4jExecutionError,
};

/// State of one translation pass (one root field).
///
/// Everything except the identifier scope is borrowed and immutable, so a schema can serve any
/// number of concurrent translations.
pub struct Translation<'a> {
    pub schema: &'a Neo4jSchema,
    pub context: &'a TranslationContext,
    pub config: &'a TranslatorConfig,
    pub scope: IdentifierScope,
    jwt: OnceCell<Param>,
}

impl<'a> Translation<'a> {
    pub fn new(
        schema: &'a Neo4jSchema,
        context: &'a TranslationContext,
        config: &'a TranslatorConfig,
    ) -> Self {
        Self {
            schema,
            context,
            config,
            scope: IdentifierScope::new(),
            jwt: OnceCell::new(),
        }
    }

    pub fn typ(&self, type_id: TypeId) -> &'a TypeDescriptor {
        &self.schema.types[type_id]
    }

    pub fn relationship(&self, id: RelationshipId) -> &'a RelationshipDescriptor {
        self.schema.relationship(id)
    }

    /// The `$jwt` parameter holding the caller's claims, `None` for unauthenticated callers
    pub fn jwt_param(&self) -> Result<Option<Param>, Neo4jExecutionError> {
        let Some(claims) = &self.context.claims else {
            return Ok(None);
        };
        if let Some(param) = self.jwt.get() {
            return Ok(Some(param.clone()));
        }

        let param = Param::named("jwt", val_to_cypher(&claims.as_val())?);
        Ok(Some(self.jwt.get_or_init(|| param).clone()))
    }

    pub fn check_depth(&self, depth: usize, field_name: &str) -> Result<(), Neo4jExecutionError> {
        if depth > self.config.max_nesting_depth {
            Err(Neo4jExecutionError::Validation(
                field_name.to_string(),
                format!(
                    "Input is nested deeper than the maximum of {}",
                    self.config.max_nesting_depth
                ),
            ))
        } else {
            Ok(())
        }
    }

    /// `(variable:Label)` for a node type
    pub fn node_pattern(&self, type_id: TypeId, variable: &Variable) -> NodePattern {
        NodePattern::new(
            Some(variable.clone()),
            self.typ(type_id).labels().to_vec(),
        )
    }

    /// The end node of a traversal to `type_id`. An interface or union can't be matched by label,
    /// so its node is left unlabeled and constrained by a predicate over the implementations'
    /// labels instead.
    pub fn target_node(&self, type_id: TypeId, variable: &Variable) -> (NodePattern, Predicate) {
        if !self.typ(type_id).is_abstract() {
            return (self.node_pattern(type_id, variable), Predicate::True);
        }

        let predicate = Predicate::or_all(
            self.schema
                .concrete_types(type_id)
                .into_iter()
                .map(|concrete| self.label_predicate(concrete, variable)),
        );
        (NodePattern::new(Some(variable.clone()), vec![]), predicate)
    }

    /// `variable:Label` for every label of a node type
    pub fn label_predicate(&self, type_id: TypeId, variable: &Variable) -> Predicate {
        Predicate::and_all(self.typ(type_id).labels().iter().map(|label| {
            Predicate::Expression(Expression::HasLabel(variable.clone(), label.clone()))
        }))
    }

    /// `(source)-[rel:TYPE]->(target)` oriented as declared on the relationship field
    pub fn relationship_pattern(
        &self,
        source: &Variable,
        relationship: &RelationshipDescriptor,
        rel_variable: Option<&Variable>,
        target: NodePattern,
        directed: bool,
    ) -> Pattern {
        let direction = match (directed, relationship.direction) {
            (false, _) => Direction::Undirected,
            (true, RelationshipDirection::Out) => Direction::Outgoing,
            (true, RelationshipDirection::In) => Direction::Incoming,
        };

        Pattern::related(
            NodePattern::bound(source),
            RelationshipPattern {
                variable: rel_variable.cloned(),
                rel_type: relationship.rel_type.clone(),
                direction,
            },
            target,
        )
    }
}
