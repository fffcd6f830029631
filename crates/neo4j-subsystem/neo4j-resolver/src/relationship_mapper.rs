// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Nested mutations on relationship fields.
//!
//! Every operation item becomes a `CALL` subquery importing the parent node, so an item that
//! matches nothing leaves the outer row alone. Items recurse into the related node's own
//! relationship inputs with the depth bounded by the configured maximum.

use indexmap::IndexMap;

use common::value::Val;
use exo_cypher::{
    Clause, Expression, NodePattern, Pattern, Predicate, Projection, ProjectionItem, SetItem,
    Variable,
};
use neo4j_model::{
    access::{AuthOperation, ValidationTiming},
    relationship::{NestedOperation, RelationshipDescriptor, RelationshipId},
    types::{FieldKind, TypeId, TypeKind, WriteOperation},
};

use crate::{
    access::{check_authentication, filter_rules, validation_clause},
    cardinality::cardinality_checks,
    cast::value_expression,
    create_data_mapper::{generated_assignments, input_object, property_assignments},
    cypher_mapper::CypherMapper,
    delete_mapper::delete_related,
    neo4j_execution_error::Neo4jExecutionError,
    predicate_mapper::{ConnectionWhereInput, WhereInput},
    translation::Translation,
    update_data_mapper::UpdateInput,
};

/// Operations allowed inside a create input
const CREATE_ORDER: [NestedOperation; 3] = [
    NestedOperation::Connect,
    NestedOperation::ConnectOrCreate,
    NestedOperation::Create,
];

/// Order in which the operations of one update item (and the arguments of a root update) run
pub(crate) const UPDATE_ORDER: [NestedOperation; 6] = [
    NestedOperation::Disconnect,
    NestedOperation::Connect,
    NestedOperation::ConnectOrCreate,
    NestedOperation::Update,
    NestedOperation::Create,
    NestedOperation::Delete,
];

/// The node whose relationships are mutated
#[derive(Debug, Clone, Copy)]
pub(crate) struct Parent<'a> {
    pub node: &'a Variable,
    pub type_id: TypeId,
}

/// Clauses of a set of nested mutations, and the relationships they touched
#[derive(Debug, Default)]
pub(crate) struct NestedMutations {
    pub clauses: Vec<Clause>,
    pub touched: Vec<RelationshipId>,
}

impl NestedMutations {
    fn touch(&mut self, id: RelationshipId) {
        if !self.touched.contains(&id) {
            self.touched.push(id);
        }
    }

    pub fn append(&mut self, other: NestedMutations) {
        self.clauses.extend(other.clauses);
        for id in other.touched {
            self.touch(id);
        }
    }
}

/// Relationship entries of a create input: `{ actors: { create: [...], connect: [...] } }`
pub(crate) fn create_input_relationships(
    parent: Parent,
    input: &IndexMap<String, Val>,
    translation: &Translation,
    depth: usize,
) -> Result<NestedMutations, Neo4jExecutionError> {
    let mut mutations = NestedMutations::default();

    for (key, value) in input {
        let Some((id, relationship)) = translation.schema.relationship_of(parent.type_id, key)
        else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        mutations.touch(id);

        for (target, operations) in targets(relationship, key, value, translation)? {
            let operations = input_object(operations, key)?;
            check_keys(key, operations, &CREATE_ORDER.map(NestedOperation::input_name))?;

            for operation in CREATE_ORDER {
                if let Some(items) = operations.get(operation.input_name()) {
                    mutations.clauses.extend(apply(
                        operation,
                        parent,
                        id,
                        target,
                        items,
                        translation,
                        depth,
                    )?);
                }
            }
        }
    }

    Ok(mutations)
}

/// Relationship entries of an update input: `{ actors: [{ where, update, connect, ... }] }`
pub(crate) fn update_input_relationships(
    parent: Parent,
    input: &IndexMap<String, Val>,
    translation: &Translation,
    depth: usize,
) -> Result<NestedMutations, Neo4jExecutionError> {
    let mut allowed = vec!["where"];
    allowed.extend(UPDATE_ORDER.map(NestedOperation::input_name));

    let mut mutations = NestedMutations::default();

    for (key, value) in input {
        let Some((id, relationship)) = translation.schema.relationship_of(parent.type_id, key)
        else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        mutations.touch(id);

        for (target, items) in targets(relationship, key, value, translation)? {
            for item in as_items(items) {
                let operations = input_object(item, key)?;
                check_keys(key, operations, &allowed)?;

                for operation in UPDATE_ORDER {
                    // An update reads the item's `where` next to its own input
                    let items = match operation {
                        NestedOperation::Update if operations.contains_key("update") => Some(item),
                        NestedOperation::Update => None,
                        _ => operations.get(operation.input_name()),
                    };
                    if let Some(items) = items {
                        mutations.clauses.extend(apply(
                            operation,
                            parent,
                            id,
                            target,
                            items,
                            translation,
                            depth,
                        )?);
                    }
                }
            }
        }
    }

    Ok(mutations)
}

/// A `connect:`/`disconnect:`/`create:`/`delete:`/`connectOrCreate:` argument keyed by
/// relationship field, at the root of an update or nested in an operation item
pub(crate) fn operation_argument(
    operation: NestedOperation,
    parent: Parent,
    argument: &Val,
    translation: &Translation,
    depth: usize,
) -> Result<NestedMutations, Neo4jExecutionError> {
    let entries = input_object(argument, operation.input_name())?;
    let mut mutations = NestedMutations::default();

    for (key, value) in entries {
        let (id, relationship) = translation
            .schema
            .relationship_of(parent.type_id, key)
            .ok_or_else(|| {
                Neo4jExecutionError::Validation(
                    key.clone(),
                    format!(
                        "No such relationship on type {}",
                        translation.typ(parent.type_id).name
                    ),
                )
            })?;
        if value.is_null() {
            continue;
        }
        mutations.touch(id);

        for (target, items) in targets(relationship, key, value, translation)? {
            mutations.clauses.extend(apply(
                operation,
                parent,
                id,
                target,
                items,
                translation,
                depth,
            )?);
        }
    }

    Ok(mutations)
}

fn apply(
    operation: NestedOperation,
    parent: Parent,
    relationship_id: RelationshipId,
    target: TypeId,
    items: &Val,
    translation: &Translation,
    depth: usize,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let relationship = translation.relationship(relationship_id);
    if !relationship.allows(operation) {
        return Err(Neo4jExecutionError::Validation(
            relationship.field_name.clone(),
            format!(
                "Nested {} is not allowed on {}.{}",
                operation.input_name(),
                translation.typ(relationship.owner).name,
                relationship.field_name
            ),
        ));
    }
    translation.check_depth(depth + 1, &relationship.field_name)?;

    let mut clauses = vec![];
    for item in as_items(items) {
        let item = input_object(item, &relationship.field_name)?;
        let related = Related {
            parent,
            relationship,
            target,
            depth: depth + 1,
        };
        clauses.extend(match operation {
            NestedOperation::Create => create_related(related, item, translation)?,
            NestedOperation::Connect => connect_related(related, item, translation)?,
            NestedOperation::Disconnect => disconnect_related(related, item, translation)?,
            NestedOperation::Update => update_related(related, item, translation)?,
            NestedOperation::Delete => delete_related(related, item, translation)?,
            NestedOperation::ConnectOrCreate => {
                connect_or_create_related(related, item, translation)?
            }
        });
    }
    Ok(clauses)
}

/// One relationship being mutated from a parent node
#[derive(Clone, Copy)]
pub(crate) struct Related<'a> {
    pub parent: Parent<'a>,
    pub relationship: &'a RelationshipDescriptor,
    /// The concrete member for union relationships, otherwise the relationship's target
    pub target: TypeId,
    /// Depth of the related node
    pub depth: usize,
}

impl Related<'_> {
    /// `(parent)<-[edge:TYPE]-(node)` with the node unlabeled, constrained by the returned
    /// predicate for interface targets
    pub fn pattern(
        &self,
        edge: Option<&Variable>,
        node: &Variable,
        translation: &Translation,
    ) -> (Pattern, Predicate) {
        let (target, labels) = translation.target_node(self.target, node);
        (
            translation.relationship_pattern(
                self.parent.node,
                self.relationship,
                edge,
                target,
                true,
            ),
            labels,
        )
    }

    /// The `where: { node, edge }` of an item matching existing relationships
    pub fn connection_where(
        &self,
        item: &IndexMap<String, Val>,
        node: &Variable,
        edge: &Variable,
        translation: &Translation,
    ) -> Result<Predicate, Neo4jExecutionError> {
        match item.get("where").filter(|value| !value.is_null()) {
            Some(filter) => ConnectionWhereInput {
                relationship: self.relationship,
                type_id: self.target,
                node,
                edge,
            }
            .to_cypher(filter, translation),
            None => Ok(Predicate::True),
        }
    }

    /// `WITH *` then `CALL { WITH parent ... }`
    pub fn subquery(&self, body: Vec<Clause>) -> Vec<Clause> {
        let mut clauses = vec![Clause::with_variables(&[self.parent.node])];
        clauses.extend(body);
        vec![Clause::With(Projection::star()), Clause::call(clauses)]
    }
}

/// `create: { node, edge }`
///
/// ```cypher
/// WITH *
/// CREATE (this1:Actor)
/// SET this1.name = $param0
/// MERGE (this0)<-[this2:ACTED_IN]-(this1)
/// SET this2.role = $param1
/// ```
fn create_related(
    related: Related,
    item: &IndexMap<String, Val>,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let relationship = related.relationship;
    let node_input = item
        .get("node")
        .filter(|value| !value.is_null())
        .ok_or_else(|| Neo4jExecutionError::MissingArgument("node".to_string()))?;
    let (concrete, node_input) = concrete_input(related.target, node_input, translation)?;
    let node_input = input_object(node_input, &translation.typ(concrete).name)?;

    check_authentication(concrete, AuthOperation::Create, translation)?;

    let node = translation.scope.fresh_node();
    let edge = translation.scope.fresh_node();

    let mut clauses = vec![
        Clause::With(Projection::star()),
        Clause::Create(Pattern::node(translation.node_pattern(concrete, &node))),
    ];
    push_set(
        &mut clauses,
        property_assignments(
            concrete,
            &node,
            node_input,
            &[],
            WriteOperation::Create,
            translation,
        )?,
    );

    clauses.push(Clause::Merge {
        pattern: translation.relationship_pattern(
            related.parent.node,
            relationship,
            Some(&edge),
            NodePattern::bound(&node),
            true,
        ),
        on_create: vec![],
    });
    push_set(
        &mut clauses,
        edge_assignments(relationship, &edge, item.get("edge"), WriteOperation::Create, translation)?,
    );

    let nested = create_input_relationships(
        Parent {
            node: &node,
            type_id: concrete,
        },
        node_input,
        translation,
        related.depth,
    )?;
    clauses.extend(nested.clauses);

    clauses.extend(validation_clause(
        &[(concrete, &node)],
        AuthOperation::Create,
        ValidationTiming::After,
        translation,
    )?);
    clauses.extend(cardinality_checks(
        &node,
        concrete,
        &nested.touched,
        true,
        translation,
    ));

    Ok(clauses)
}

/// `connect: { where: { node }, edge, connect }`
///
/// Every node matching the filter is connected. An `OPTIONAL MATCH` followed by a
/// `collect`/`UNWIND` keeps the parent row when nothing matches.
fn connect_related(
    related: Related,
    item: &IndexMap<String, Val>,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let relationship = related.relationship;
    let node = translation.scope.fresh_node();
    let edge = translation.scope.fresh_node();
    let list = translation.scope.fresh_var();
    let result = translation.scope.fresh_var();

    let (target_pattern, labels) = translation.target_node(related.target, &node);
    let filter = match item
        .get("where")
        .and_then(|filter| filter.get("node"))
        .filter(|value| !value.is_null())
    {
        Some(filter) => WhereInput {
            type_id: related.target,
            node: &node,
        }
        .to_cypher(filter, translation)?,
        None => Predicate::True,
    };
    let auth = filter_rules(
        related.target,
        &[],
        AuthOperation::CreateRelationship,
        &node,
        translation,
    )?;

    let mut body = vec![
        Clause::optional_matching(
            Pattern::node(target_pattern),
            Predicate::and_all([labels, filter, auth]),
        ),
        Clause::With(Projection::items(vec![
            ProjectionItem::plain(related.parent.node),
            ProjectionItem::aliased(
                Expression::function("collect", vec![node.expr()]),
                &list,
            ),
        ])),
        Clause::Unwind {
            list: list.expr(),
            alias: node.clone(),
        },
    ];

    let endpoints = [
        (related.parent.type_id, related.parent.node),
        (related.target, &node),
    ];
    body.extend(validation_clause(
        &endpoints,
        AuthOperation::CreateRelationship,
        ValidationTiming::Before,
        translation,
    )?);

    body.push(Clause::Merge {
        pattern: translation.relationship_pattern(
            related.parent.node,
            relationship,
            Some(&edge),
            NodePattern::bound(&node),
            true,
        ),
        on_create: vec![],
    });
    push_set(
        &mut body,
        edge_assignments(relationship, &edge, item.get("edge"), WriteOperation::Create, translation)?,
    );

    if let Some(nested) = item.get("connect").filter(|value| !value.is_null()) {
        let target = Parent {
            node: &node,
            type_id: related.target,
        };
        body.extend(
            operation_argument(NestedOperation::Connect, target, nested, translation, related.depth)?
                .clauses,
        );
    }

    body.extend(validation_clause(
        &endpoints,
        AuthOperation::CreateRelationship,
        ValidationTiming::After,
        translation,
    )?);

    // The connected node's side of the relationship may be to-one as well
    if let Some(reverse) = relationship.reverse {
        if !translation.typ(related.target).is_abstract() {
            body.extend(cardinality_checks(
                &node,
                related.target,
                &[reverse],
                false,
                translation,
            ));
        }
    }

    body.push(count_result(&result));
    Ok(related.subquery(body))
}

/// `disconnect: { where: { node, edge }, disconnect }`
fn disconnect_related(
    related: Related,
    item: &IndexMap<String, Val>,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let node = translation.scope.fresh_node();
    let edge = translation.scope.fresh_node();
    let result = translation.scope.fresh_var();

    let (pattern, labels) = related.pattern(Some(&edge), &node, translation);
    let filter = related.connection_where(item, &node, &edge, translation)?;
    let auth = filter_rules(
        related.target,
        &[],
        AuthOperation::DeleteRelationship,
        &node,
        translation,
    )?;

    let mut body = vec![Clause::optional_matching(
        pattern,
        Predicate::and_all([labels, filter, auth]),
    )];

    let endpoints = [
        (related.parent.type_id, related.parent.node),
        (related.target, &node),
    ];
    body.extend(validation_clause(
        &endpoints,
        AuthOperation::DeleteRelationship,
        ValidationTiming::Before,
        translation,
    )?);

    if let Some(nested) = item.get("disconnect").filter(|value| !value.is_null()) {
        let target = Parent {
            node: &node,
            type_id: related.target,
        };
        body.extend(
            operation_argument(
                NestedOperation::Disconnect,
                target,
                nested,
                translation,
                related.depth,
            )?
            .clauses,
        );
    }

    body.push(Clause::Delete {
        detach: false,
        items: vec![edge.expr()],
    });
    body.extend(validation_clause(
        &endpoints,
        AuthOperation::DeleteRelationship,
        ValidationTiming::After,
        translation,
    )?);
    body.push(count_result(&result));

    Ok(related.subquery(body))
}

/// `update: { node, edge }` with the item's `where: { node, edge }`
fn update_related(
    related: Related,
    item: &IndexMap<String, Val>,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let relationship = related.relationship;
    let update = item
        .get("update")
        .map(|update| input_object(update, "update"))
        .transpose()?;
    let node_input = update
        .and_then(|update| update.get("node"))
        .filter(|value| !value.is_null());
    let edge_input = update
        .and_then(|update| update.get("edge"))
        .filter(|value| !value.is_null());

    check_authentication(related.target, AuthOperation::Update, translation)?;

    let node = translation.scope.fresh_node();
    let edge = translation.scope.fresh_node();
    let result = translation.scope.fresh_var();

    let (pattern, labels) = related.pattern(Some(&edge), &node, translation);
    let filter = related.connection_where(item, &node, &edge, translation)?;
    let auth = filter_rules(
        related.target,
        &[],
        AuthOperation::Update,
        &node,
        translation,
    )?;

    let mut body = vec![Clause::matching(
        pattern,
        Predicate::and_all([labels, filter, auth]),
    )];
    body.extend(validation_clause(
        &[(related.target, &node)],
        AuthOperation::Update,
        ValidationTiming::Before,
        translation,
    )?);

    let mut assignments = vec![];
    if let Some(node_input) = node_input {
        assignments.extend(
            UpdateInput {
                type_id: related.target,
                entity: &node,
            }
            .to_cypher(node_input, translation)?,
        );
    }
    assignments.extend(edge_assignments(
        relationship,
        &edge,
        edge_input,
        WriteOperation::Update,
        translation,
    )?);
    push_set(&mut body, assignments);

    let mut touched = vec![];
    if let Some(node_input) = node_input {
        let nested = update_input_relationships(
            Parent {
                node: &node,
                type_id: related.target,
            },
            input_object(node_input, "node")?,
            translation,
            related.depth,
        )?;
        body.extend(nested.clauses);
        touched = nested.touched;
    }

    body.extend(validation_clause(
        &[(related.target, &node)],
        AuthOperation::Update,
        ValidationTiming::After,
        translation,
    )?);
    if !translation.typ(related.target).is_abstract() {
        body.extend(cardinality_checks(
            &node,
            related.target,
            &touched,
            false,
            translation,
        ));
    }
    body.push(count_result(&result));

    Ok(related.subquery(body))
}

/// `connectOrCreate: { where: { node: <unique fields> }, onCreate: { node, edge } }`
///
/// ```cypher
/// MERGE (this1:Person { name: $param0 })
/// ON CREATE SET this1.born = $param1
/// MERGE (this0)<-[this2:DIRECTED]-(this1)
/// ```
fn connect_or_create_related(
    related: Related,
    item: &IndexMap<String, Val>,
    translation: &Translation,
) -> Result<Vec<Clause>, Neo4jExecutionError> {
    let relationship = related.relationship;
    let typ = translation.typ(related.target);
    if typ.is_abstract() {
        return Err(Neo4jExecutionError::Validation(
            relationship.field_name.clone(),
            format!("connectOrCreate is not supported for {}", typ.name),
        ));
    }

    let unique = item
        .get("where")
        .and_then(|filter| filter.get("node"))
        .filter(|value| !value.is_null())
        .ok_or_else(|| Neo4jExecutionError::MissingArgument("where".to_string()))?;
    let unique = input_object(unique, "where")?;
    if unique.is_empty() {
        return Err(Neo4jExecutionError::Validation(
            "where".to_string(),
            "At least one unique field is required".to_string(),
        ));
    }
    let on_create = item
        .get("onCreate")
        .map(|on_create| input_object(on_create, "onCreate"))
        .transpose()?;

    check_authentication(related.target, AuthOperation::Create, translation)?;

    let node = translation.scope.fresh_node();
    let edge = translation.scope.fresh_node();
    let result = translation.scope.fresh_var();

    let mut target = translation.node_pattern(related.target, &node);
    for (key, value) in unique {
        let property = typ
            .field(key)
            .and_then(|field| match &field.kind {
                FieldKind::Property(property) if property.unique => Some((field, property)),
                _ => None,
            })
            .ok_or_else(|| {
                Neo4jExecutionError::Validation(
                    key.clone(),
                    format!("Not a unique field of {}", typ.name),
                )
            })?;
        let (field, property) = property;
        target.properties.push((
            property.db_name.clone(),
            value_expression(value, &property.scalar, field.typ.list)?,
        ));
    }

    let preset: Vec<&str> = unique.keys().map(String::as_str).collect();
    let empty = IndexMap::new();
    let node_input = match on_create.and_then(|on_create| on_create.get("node")) {
        Some(node_input) if !node_input.is_null() => input_object(node_input, "node")?,
        _ => &empty,
    };
    if node_input
        .keys()
        .any(|key| translation.schema.relationship_of(related.target, key).is_some())
    {
        return Err(Neo4jExecutionError::Validation(
            "onCreate".to_string(),
            "Relationships cannot be created through connectOrCreate".to_string(),
        ));
    }

    let body = vec![
        Clause::Merge {
            pattern: Pattern::node(target),
            on_create: property_assignments(
                related.target,
                &node,
                node_input,
                &preset,
                WriteOperation::Create,
                translation,
            )?,
        },
        Clause::Merge {
            pattern: translation.relationship_pattern(
                related.parent.node,
                relationship,
                Some(&edge),
                NodePattern::bound(&node),
                true,
            ),
            on_create: edge_assignments(
                relationship,
                &edge,
                on_create.and_then(|on_create| on_create.get("edge")),
                WriteOperation::Create,
                translation,
            )?,
        },
        count_result(&result),
    ];

    Ok(related.subquery(body))
}

/// Assignments to the relationship's properties
pub(crate) fn edge_assignments(
    relationship: &RelationshipDescriptor,
    edge: &Variable,
    input: Option<&Val>,
    operation: WriteOperation,
    translation: &Translation,
) -> Result<Vec<SetItem>, Neo4jExecutionError> {
    let input = input.filter(|value| !value.is_null());

    let Some(properties) = relationship.properties else {
        return match input {
            Some(_) => Err(Neo4jExecutionError::Validation(
                "edge".to_string(),
                format!("{} has no relationship properties", relationship.field_name),
            )),
            None => Ok(vec![]),
        };
    };

    match (input, operation) {
        (Some(input), WriteOperation::Create) => property_assignments(
            properties,
            edge,
            input_object(input, "edge")?,
            &[],
            operation,
            translation,
        ),
        (Some(input), WriteOperation::Update) => UpdateInput {
            type_id: properties,
            entity: edge,
        }
        .to_cypher(input, translation),
        (None, _) => generated_assignments(properties, edge, |_| false, operation, translation),
    }
}

/// Union relationships take their input keyed by member type
fn targets<'v>(
    relationship: &RelationshipDescriptor,
    key: &str,
    value: &'v Val,
    translation: &Translation,
) -> Result<Vec<(TypeId, &'v Val)>, Neo4jExecutionError> {
    let target = translation.typ(relationship.target);
    if !matches!(target.kind, TypeKind::Union { .. }) {
        return Ok(vec![(relationship.target, value)]);
    }

    let members = translation.schema.concrete_types(relationship.target);
    input_object(value, key)?
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| {
            match translation.schema.get_type(name) {
                Some((member, _)) if members.contains(&member) => Ok((member, value)),
                _ => Err(Neo4jExecutionError::Validation(
                    key.to_string(),
                    format!("{name} is not a member of {}", target.name),
                )),
            }
        })
        .collect()
}

/// The implementation named in an interface's `create.node: { Movie: {...} }`
fn concrete_input<'v>(
    target: TypeId,
    input: &'v Val,
    translation: &Translation,
) -> Result<(TypeId, &'v Val), Neo4jExecutionError> {
    let typ = translation.typ(target);
    if !typ.is_abstract() {
        return Ok((target, input));
    }

    let entries = input_object(input, "node")?;
    let mut given = entries.iter().filter(|(_, value)| !value.is_null());
    match (given.next(), given.next()) {
        (Some((name, value)), None) => match translation.schema.get_type(name) {
            Some((concrete, _)) if translation.schema.concrete_types(target).contains(&concrete) => {
                Ok((concrete, value))
            }
            _ => Err(Neo4jExecutionError::Validation(
                "node".to_string(),
                format!("{name} does not implement {}", typ.name),
            )),
        },
        _ => Err(Neo4jExecutionError::Validation(
            "node".to_string(),
            format!("Exactly one implementation of {} must be given", typ.name),
        )),
    }
}

/// To-many relationships take a list, a single object stands for a one-element list
pub(crate) fn as_items(value: &Val) -> Vec<&Val> {
    match value {
        Val::List(items) => items.iter().filter(|item| !item.is_null()).collect(),
        Val::Null => vec![],
        item => vec![item],
    }
}

fn check_keys(
    field_name: &str,
    input: &IndexMap<String, Val>,
    allowed: &[&str],
) -> Result<(), Neo4jExecutionError> {
    match input.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(Neo4jExecutionError::Validation(
            field_name.to_string(),
            format!("Unexpected input '{key}'"),
        )),
        None => Ok(()),
    }
}

fn push_set(clauses: &mut Vec<Clause>, items: Vec<SetItem>) {
    if !items.is_empty() {
        clauses.push(Clause::Set(items));
    }
}

/// `RETURN count(*) AS varN`; a subquery must return something to keep the outer row
pub(crate) fn count_result(result: &Variable) -> Clause {
    Clause::Return(Projection::single(
        Expression::count_all(),
        result,
    ))
}
