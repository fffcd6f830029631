// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Selection sets as map projections.
//!
//! Scalar fields become entries of the map (`this { .title, year: this.released }`); everything
//! that needs its own traversal (relationships, aggregates, connections, `@cypher` fields) is
//! computed in a `CALL` subquery placed before the projection, and the map refers to the
//! subquery's result variable.

use std::collections::{HashMap, hash_map::Entry};

use async_graphql_value::Name;
use common::value::Val;
use core_resolver::validation::field::ValidatedField;
use exo_cypher::{
    Clause, Expression, MapProjection, MapProjectionItem, Predicate, Projection, Query, Variable,
};
use indexmap::IndexMap;
use neo4j_model::{
    access::AuthOperation,
    relationship::{Cardinality, RelationshipDescriptor, RelationshipId},
    types::{FieldDescriptor, FieldKind, PropertyField, RequiredSelection, ScalarType, TypeId, TypeKind},
};

use crate::{
    access, aggregate, connection, cypher_field,
    cypher_mapper::CypherMapper,
    neo4j_execution_error::Neo4jExecutionError,
    order_by_mapper::{Options, OptionsInput, SortField},
    predicate_mapper::{WhereInput, property_expression},
    translation::Translation,
};

/// The map projection of one node along with the subqueries it depends on
#[derive(Debug, Default)]
pub(crate) struct NodeProjection {
    pub items: Vec<MapProjectionItem>,
    pub subqueries: Vec<Clause>,
}

impl NodeProjection {
    pub fn map(&self, node: &Variable) -> Expression {
        Expression::MapProjection(MapProjection {
            variable: node.clone(),
            items: self.items.clone(),
        })
    }

    fn has_key(&self, key: &str) -> bool {
        self.items.iter().any(|item| match item {
            MapProjectionItem::Property(name) | MapProjectionItem::Entry(name, _) => name == key,
        })
    }

    /// Tag a member of a polymorphic result with its concrete type
    pub fn tag(&mut self, type_name: &str, node: &Variable) {
        self.items.push(MapProjectionItem::Entry(
            "__resolveType".to_string(),
            Expression::string(type_name),
        ));
        self.items.push(MapProjectionItem::Entry(
            "__id".to_string(),
            Expression::function("id", vec![node.expr()]),
        ));
    }

    /// Make sure the fields sorted on after projecting are part of the map
    pub fn include_sort_fields(
        &mut self,
        sort: &[SortField],
        node: &Variable,
    ) -> Result<(), Neo4jExecutionError> {
        for field in sort {
            let key = &field.target.field_name;
            if !self.has_key(key) {
                let value = property_expression(node, &field.target)?;
                self.items.push(if value == node.property(key) {
                    MapProjectionItem::Property(key.clone())
                } else {
                    MapProjectionItem::Entry(key.clone(), value)
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn project_node(
    type_id: TypeId,
    node: &Variable,
    selection: &[ValidatedField],
    translation: &Translation,
    depth: usize,
) -> Result<NodeProjection, Neo4jExecutionError> {
    let typ = translation.typ(type_id);
    let supertypes = translation.schema.supertypes(type_id);

    let mut projection = NodeProjection::default();
    // Output name to the field projected under it
    let mut selected: HashMap<String, Name> = HashMap::new();
    let mut required = vec![];

    for field in selection
        .iter()
        .filter(|field| field.applies_to(&typ.name, &supertypes))
    {
        if let Entry::Vacant(entry) = selected.entry(field.output_name()) {
            entry.insert(field.name.clone());
            project_field(type_id, node, field, &mut projection, &mut required, translation, depth)?;
        }
    }

    // Custom resolvers compute their value from other fields, which must be fetched even when not
    // selected. A required field may itself be a custom resolver, hence the growing list.
    let mut index = 0;
    while index < required.len() {
        let field: ValidatedField = required[index].clone();
        index += 1;
        match selected.entry(field.output_name()) {
            Entry::Vacant(entry) => {
                entry.insert(field.name.clone());
                project_field(type_id, node, &field, &mut projection, &mut required, translation, depth)?;
            }
            Entry::Occupied(entry) if *entry.get() != field.name => {
                return Err(Neo4jExecutionError::Validation(
                    entry.key().clone(),
                    format!(
                        "The alias hides field {} of {}, which a custom resolver requires",
                        field.name, typ.name
                    ),
                ));
            }
            Entry::Occupied(_) => {}
        }
    }

    Ok(projection)
}

fn project_field(
    type_id: TypeId,
    node: &Variable,
    field: &ValidatedField,
    projection: &mut NodeProjection,
    required: &mut Vec<ValidatedField>,
    translation: &Translation,
    depth: usize,
) -> Result<(), Neo4jExecutionError> {
    let typ = translation.typ(type_id);
    let output_name = field.output_name();

    if field.name.as_str() == "__typename" {
        projection.items.push(MapProjectionItem::Entry(
            output_name,
            Expression::string(typ.name.clone()),
        ));
        return Ok(());
    }

    if let Some(descriptor) = typ.field(&field.name) {
        match &descriptor.kind {
            FieldKind::Property(property) => {
                projection
                    .items
                    .push(property_item(&output_name, node, descriptor, property));
            }
            FieldKind::Relationship(relationship) => {
                let (value, subquery) =
                    relationship_projection(*relationship, node, field, translation, depth)?;
                projection.subqueries.push(subquery);
                projection
                    .items
                    .push(MapProjectionItem::Entry(output_name, value));
            }
            FieldKind::Cypher(cypher) => {
                let (value, subquery) =
                    cypher_field::project(descriptor, cypher, node, field, translation, depth)?;
                projection.subqueries.push(subquery);
                projection
                    .items
                    .push(MapProjectionItem::Entry(output_name, value));
            }
            FieldKind::CustomResolver { requires } => {
                required.extend(requires.iter().map(required_field));
            }
        }
        return Ok(());
    }

    if let Some(relationship) = field
        .name
        .strip_suffix("Aggregate")
        .and_then(|name| translation.schema.relationship_of(type_id, name))
    {
        let (value, subqueries) =
            aggregate::nested_aggregate(relationship.0, node, field, translation, depth)?;
        projection.subqueries.extend(subqueries);
        projection
            .items
            .push(MapProjectionItem::Entry(output_name, value));
        return Ok(());
    }

    if let Some(relationship) = field
        .name
        .strip_suffix("Connection")
        .and_then(|name| translation.schema.relationship_of(type_id, name))
    {
        let (value, subquery) =
            connection::connection_projection(relationship.0, node, field, translation, depth)?;
        projection.subqueries.push(subquery);
        projection
            .items
            .push(MapProjectionItem::Entry(output_name, value));
        return Ok(());
    }

    Err(Neo4jExecutionError::Validation(
        field.name.to_string(),
        format!("No such field on type {}", typ.name),
    ))
}

/// The value of a property in the response. `DateTime` values are rendered with an explicit
/// offset, other temporals with their ISO string form.
pub(crate) fn property_item(
    output_name: &str,
    node: &Variable,
    descriptor: &FieldDescriptor,
    property: &PropertyField,
) -> MapProjectionItem {
    let value = node.property(&property.db_name);

    if !descriptor.typ.list && property.scalar.is_temporal() {
        return MapProjectionItem::Entry(
            output_name.to_string(),
            temporal_output(&property.scalar, value),
        );
    }

    if output_name == property.db_name {
        MapProjectionItem::Property(property.db_name.clone())
    } else {
        MapProjectionItem::Entry(output_name.to_string(), value)
    }
}

pub(crate) fn temporal_output(scalar: &ScalarType, value: Expression) -> Expression {
    let string_value = Expression::function("toString", vec![value]);
    match scalar {
        ScalarType::DateTime => Expression::function(
            "apoc.date.convertFormat",
            vec![
                string_value,
                Expression::string("iso_zoned_date_time"),
                Expression::string("iso_offset_date_time"),
            ],
        ),
        _ => string_value,
    }
}

fn required_field(required: &RequiredSelection) -> ValidatedField {
    ValidatedField {
        alias: None,
        name: Name::new(&required.field),
        arguments: IndexMap::new(),
        type_condition: None,
        subfields: required.subfields.iter().map(required_field).collect(),
    }
}

/// Fields of the type named by a selection, for field-level authorization
pub(crate) fn selected_fields<'a>(
    type_id: TypeId,
    selection: &[ValidatedField],
    translation: &Translation<'a>,
) -> Vec<&'a FieldDescriptor> {
    let typ = translation.typ(type_id);
    typ.fields
        .iter()
        .filter(|descriptor| {
            selection
                .iter()
                .any(|field| field.name.as_str() == descriptor.name)
        })
        .collect()
}

/// The `where` argument together with the authorization filters of the matched type
#[allow(clippy::too_many_arguments)]
pub(crate) fn read_predicate(
    filter_type: TypeId,
    concrete_type: TypeId,
    filter: Option<&Val>,
    selection: &[ValidatedField],
    operation: AuthOperation,
    node: &Variable,
    translation: &Translation,
) -> Result<Predicate, Neo4jExecutionError> {
    access::check_authentication(concrete_type, operation, translation)?;

    let user_filter = match filter {
        Some(filter) => WhereInput {
            type_id: filter_type,
            node,
        }
        .to_cypher(filter, translation)?,
        None => Predicate::True,
    };
    let fields = selected_fields(concrete_type, selection, translation);
    let auth_filter = access::filter_rules(concrete_type, &fields, operation, node, translation)?;

    Ok(Predicate::and(user_filter, auth_filter))
}

pub(crate) fn options(
    field: &ValidatedField,
    type_id: TypeId,
    translation: &Translation,
) -> Result<Options, Neo4jExecutionError> {
    match field.get_argument("options") {
        Some(options) => OptionsInput { type_id }.to_cypher(options, translation),
        None => Ok(Options::default()),
    }
}

/// One concrete type reached by a read, with the part of the `where` argument that applies to it
pub(crate) struct Branch<'a> {
    pub type_id: TypeId,
    /// The type the filter is written against (the interface for interface filters)
    pub filter_type: TypeId,
    pub filter: Option<&'a Val>,
}

/// Concrete branches of a (possibly abstract) type. Union filters are keyed by member, and only
/// the members named in a non-empty filter are read.
pub(crate) fn branches<'a>(
    type_id: TypeId,
    filter: Option<&'a Val>,
    translation: &Translation,
) -> Result<Vec<Branch<'a>>, Neo4jExecutionError> {
    match &translation.typ(type_id).kind {
        TypeKind::Union { members } => {
            let keyed = filter.and_then(Val::as_object).filter(|keyed| !keyed.is_empty());
            match keyed {
                Some(keyed) => keyed
                    .iter()
                    .map(|(member_name, member_filter)| {
                        let member = members
                            .iter()
                            .find(|member| translation.typ(**member).name == *member_name)
                            .ok_or_else(|| {
                                Neo4jExecutionError::Validation(
                                    "where".to_string(),
                                    format!(
                                        "{member_name} is not a member of {}",
                                        translation.typ(type_id).name
                                    ),
                                )
                            })?;
                        Ok(Branch {
                            type_id: *member,
                            filter_type: *member,
                            filter: Some(member_filter),
                        })
                    })
                    .collect(),
                None => Ok(members
                    .iter()
                    .map(|member| Branch {
                        type_id: *member,
                        filter_type: *member,
                        filter: None,
                    })
                    .collect()),
            }
        }
        _ => Ok(translation
            .schema
            .concrete_types(type_id)
            .into_iter()
            .map(|concrete| Branch {
                type_id: concrete,
                filter_type: type_id,
                filter,
            })
            .collect()),
    }
}

pub(crate) fn collect_related(relationship: &RelationshipDescriptor, value: Expression) -> Expression {
    let collected = Expression::function("collect", vec![value]);
    match relationship.cardinality {
        Cardinality::One => Expression::function("head", vec![collected]),
        Cardinality::Many => collected,
    }
}

/// `CALL { WITH source MATCH (source)-[...]-(target) ... RETURN collect(target {...}) AS varN }`
fn relationship_projection(
    relationship_id: RelationshipId,
    source: &Variable,
    field: &ValidatedField,
    translation: &Translation,
    depth: usize,
) -> Result<(Expression, Clause), Neo4jExecutionError> {
    translation.check_depth(depth + 1, &field.name)?;

    let relationship = translation.relationship(relationship_id);
    let directed = relationship.is_directed(field.get_argument("directed").and_then(Val::as_bool));

    if translation.typ(relationship.target).is_abstract() {
        return abstract_relationship_projection(
            relationship,
            directed,
            source,
            field,
            translation,
            depth,
        );
    }

    let edge = translation.scope.fresh_node();
    let target = translation.scope.fresh_node();
    let pattern = translation.relationship_pattern(
        source,
        relationship,
        Some(&edge),
        translation.node_pattern(relationship.target, &target),
        directed,
    );
    let predicate = read_predicate(
        relationship.target,
        relationship.target,
        field.get_argument("where"),
        &field.subfields,
        AuthOperation::Read,
        &target,
        translation,
    )?;
    let options = options(field, relationship.target, translation)?;
    let projection =
        project_node(relationship.target, &target, &field.subfields, translation, depth + 1)?;
    let result = translation.scope.fresh_var();

    let mut clauses = vec![
        Clause::with_variables(&[source]),
        Clause::matching(pattern, predicate),
    ];
    if let Some(pagination) = options.node_clause(&target)? {
        clauses.push(Clause::With(pagination));
    }
    clauses.push(Clause::With(Projection::single(projection.map(&target), &target)));
    // Subqueries go before the projection that refers to them
    let with_index = clauses.len() - 1;
    clauses.splice(with_index..with_index, projection.subqueries);
    clauses.push(Clause::Return(Projection::single(
        collect_related(relationship, target.expr()),
        &result,
    )));

    Ok((result.expr(), Clause::call(clauses)))
}

/// A relationship to an interface or union: one `UNION` branch per concrete type, each tagged
/// with `__resolveType`
fn abstract_relationship_projection(
    relationship: &RelationshipDescriptor,
    directed: bool,
    source: &Variable,
    field: &ValidatedField,
    translation: &Translation,
    depth: usize,
) -> Result<(Expression, Clause), Neo4jExecutionError> {
    let result = translation.scope.fresh_var();
    let options = options(field, relationship.target, translation)?;

    let mut union = vec![];
    for branch in branches(relationship.target, field.get_argument("where"), translation)? {
        let edge = translation.scope.fresh_node();
        let target = translation.scope.fresh_node();
        let pattern = translation.relationship_pattern(
            source,
            relationship,
            Some(&edge),
            translation.node_pattern(branch.type_id, &target),
            directed,
        );
        let predicate = read_predicate(
            branch.filter_type,
            branch.type_id,
            branch.filter,
            &field.subfields,
            AuthOperation::Read,
            &target,
            translation,
        )?;

        let mut projection =
            project_node(branch.type_id, &target, &field.subfields, translation, depth + 1)?;
        projection.include_sort_fields(&options.sort, &target)?;
        projection.tag(&translation.typ(branch.type_id).name, &target);

        let mut clauses = vec![
            Clause::with_variables(&[source]),
            Clause::matching(pattern, predicate),
        ];
        clauses.extend(std::mem::take(&mut projection.subqueries));
        clauses.push(Clause::With(Projection::single(projection.map(&target), &target)));
        clauses.push(Clause::Return(Projection::single(target.expr(), &result)));
        union.push(clauses);
    }

    let mut ordered = Projection::variables(&[&result]);
    options.apply_to_projection(&mut ordered, &result);

    let clauses = vec![
        Clause::with_variables(&[source]),
        Clause::Call(Box::new(Query::union(union))),
        Clause::With(ordered),
        Clause::Return(Projection::single(
            collect_related(relationship, result.expr()),
            &result,
        )),
    ];

    Ok((result.expr(), Clause::call(clauses)))
}

#[cfg(test)]
mod tests {
    use exo_cypher::{ExpressionBuilder, assert_binding};

    use super::*;
    use crate::test_utils::{MOVIES, PRODUCTIONS, TestContext};

    fn movie_projection(context: &TestContext, selection: &str) -> Result<(String, String), Neo4jExecutionError> {
        let field = context.selection(&format!("{{ movies {{ {selection} }} }}"));
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (movie, _) = context.schema.get_type("Movie").unwrap();

        let projection = project_node(movie, &this, &field.subfields, &translation, 0)?;
        Ok((
            projection.map(&this).to_cypher().cypher,
            Query::Single(projection.subqueries).to_cypher().cypher,
        ))
    }

    #[test]
    fn scalar_fields() {
        let context = TestContext::new(MOVIES);

        let (map, subqueries) =
            movie_projection(&context, "__typename title year name: title createdAt releaseDate tags")
                .unwrap();
        assert_eq!(
            map,
            r#"this { __typename: "Movie", .title, year: this.released, name: this.title, createdAt: apoc.date.convertFormat(toString(this.createdAt), "iso_zoned_date_time", "iso_offset_date_time"), releaseDate: toString(this.releaseDate), .tags }"#
        );
        assert_eq!(subqueries, "");
    }

    #[test]
    fn nested_relationships() {
        let context = TestContext::new(MOVIES);

        let field = context.selection(
            r#"{ movies { title actors(where: { name_STARTS_WITH: "K" }, options: { sort: [{ name: ASC }], limit: 2 }) { name } director { name } } }"#,
        );
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (movie, _) = context.schema.get_type("Movie").unwrap();
        let projection = project_node(movie, &this, &field.subfields, &translation, 0).unwrap();

        assert_eq!(
            projection.map(&this).to_cypher().cypher,
            "this { .title, actors: var2, director: var5 }"
        );
        assert_binding!(
            Query::Single(projection.subqueries).to_cypher(),
            "CALL {\n    WITH this\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WHERE this1.name STARTS WITH $param0\n    WITH *\n    ORDER BY this1.name ASC\n    LIMIT $param1\n    WITH this1 { .name } AS this1\n    RETURN collect(this1) AS var2\n}\nCALL {\n    WITH this\n    MATCH (this)<-[this3:DIRECTED]-(this4:Person)\n    WITH this4 { .name } AS this4\n    RETURN head(collect(this4)) AS var5\n}",
            "param0" => "K",
            "param1" => 2
        );
    }

    #[test]
    fn custom_resolver_requirements() {
        let context = TestContext::new(MOVIES);

        let (map, _) = movie_projection(&context, "summary title").unwrap();
        assert_eq!(map, "this { .title, year: this.released }");

        // Aliasing another field as a required one would hand the resolver the wrong value
        assert!(matches!(
            movie_projection(&context, "summary title: year"),
            Err(Neo4jExecutionError::Validation(field, _)) if field == "title"
        ));
        let (map, _) = movie_projection(&context, "summary name: title").unwrap();
        assert_eq!(map, "this { name: this.title, .title, year: this.released }");
    }

    #[test]
    fn unknown_fields() {
        let context = TestContext::new(MOVIES);
        assert!(matches!(
            movie_projection(&context, "budget"),
            Err(Neo4jExecutionError::Validation(field, _)) if field == "budget"
        ));
    }

    #[test]
    fn interface_relationship() {
        let context = TestContext::new(PRODUCTIONS);

        let field = context.selection(
            "{ actors { actedIn(options: { sort: [{ title: DESC }] }) { title ... on Movie { runtime } } } }",
        );
        let translation = context.translation();
        let this = translation.scope.root_variable();
        let (actor, _) = context.schema.get_type("Actor").unwrap();
        let projection = project_node(actor, &this, &field.subfields, &translation, 0).unwrap();

        assert_eq!(projection.map(&this).to_cypher().cypher, "this { actedIn: var0 }");
        assert_eq!(
            Query::Single(projection.subqueries).to_cypher().cypher,
            r#"CALL {
    WITH this
    CALL {
        WITH this
        MATCH (this)-[this1:ACTED_IN]->(this2:Movie)
        WITH this2 { .title, .runtime, __resolveType: "Movie", __id: id(this2) } AS this2
        RETURN this2 AS var0
        UNION
        WITH this
        MATCH (this)-[this3:ACTED_IN]->(this4:Series)
        WITH this4 { .title, __resolveType: "Series", __id: id(this4) } AS this4
        RETURN this4 AS var0
    }
    WITH var0
    ORDER BY var0.title DESC
    RETURN collect(var0) AS var0
}"#
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let mut context = TestContext::new(MOVIES);
        context.config.max_nesting_depth = 2;

        assert!(movie_projection(&context, "actors { movies { title } }").is_ok());
        assert!(matches!(
            movie_projection(&context, "actors { movies { actors { name } } }"),
            Err(Neo4jExecutionError::Validation(..))
        ));
    }
}
