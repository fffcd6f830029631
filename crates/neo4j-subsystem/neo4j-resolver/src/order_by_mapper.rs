// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;
use exo_cypher::{CypherValue, Expression, Projection, SortDirection, SortItem, Variable};
use neo4j_model::{
    filter::PropertyTarget, filter_parser::property_target, types::TypeId,
};

use crate::{
    cypher_mapper::CypherMapper, neo4j_execution_error::Neo4jExecutionError,
    predicate_mapper::property_expression, translation::Translation,
};

/// A property to sort by
#[derive(Debug, Clone)]
pub(crate) struct SortField {
    pub target: PropertyTarget,
    pub direction: SortDirection,
}

impl SortField {
    /// Sort on the stored property of a matched node or relationship
    pub fn on_entity(&self, variable: &Variable) -> Result<SortItem, Neo4jExecutionError> {
        Ok(SortItem {
            expression: property_expression(variable, &self.target)?,
            direction: self.direction,
        })
    }

    /// Sort on an already projected map, where the value sits under the field name
    pub fn on_projection(&self, base: Expression) -> SortItem {
        SortItem {
            expression: base.property(&self.target.field_name),
            direction: self.direction,
        }
    }
}

/// `options: { sort, limit, offset }`
#[derive(Debug, Default)]
pub(crate) struct Options {
    pub sort: Vec<SortField>,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
}

impl Options {
    pub fn is_empty(&self) -> bool {
        self.sort.is_empty() && self.limit.is_none() && self.offset.is_none()
    }

    /// `WITH * ORDER BY ... SKIP ... LIMIT ...` over a matched node, `None` without options
    pub fn node_clause(&self, node: &Variable) -> Result<Option<Projection>, Neo4jExecutionError> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut projection = Projection::star();
        projection.order_by = self
            .sort
            .iter()
            .map(|field| field.on_entity(node))
            .collect::<Result<_, _>>()?;
        self.paginate(&mut projection);
        Ok(Some(projection))
    }

    /// Ordering and pagination of projected maps bound to `variable`
    pub fn apply_to_projection(&self, projection: &mut Projection, variable: &Variable) {
        projection.order_by = self
            .sort
            .iter()
            .map(|field| field.on_projection(variable.expr()))
            .collect();
        self.paginate(projection);
    }

    fn paginate(&self, projection: &mut Projection) {
        projection.skip = self.offset.clone();
        projection.limit = self.limit.clone();
    }
}

pub(crate) struct OptionsInput {
    pub type_id: TypeId,
}

impl<'a> CypherMapper<'a, Options> for OptionsInput {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<Options, Neo4jExecutionError> {
        let Val::Object(entries) = argument else {
            return Err(invalid("options", argument));
        };

        let mut options = Options::default();
        for (key, value) in entries {
            match key.as_str() {
                "sort" => {
                    options.sort = SortInput {
                        type_id: self.type_id,
                    }
                    .to_cypher(value, translation)?
                }
                "limit" => options.limit = pagination_param("limit", value, false)?,
                "offset" => options.offset = pagination_param("offset", value, true)?,
                _ => {
                    return Err(Neo4jExecutionError::Validation(
                        "options".to_string(),
                        format!("Unknown option '{key}'"),
                    ));
                }
            }
        }
        Ok(options)
    }
}

/// `sort: [{ title: ASC }, { year: DESC }]` against the fields of a type
pub(crate) struct SortInput {
    pub type_id: TypeId,
}

impl<'a> CypherMapper<'a, Vec<SortField>> for SortInput {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<Vec<SortField>, Neo4jExecutionError> {
        let typ = translation.typ(self.type_id);

        let mut fields = vec![];
        for element in argument.as_list() {
            let Val::Object(entries) = element else {
                return Err(invalid("sort", element));
            };
            for (field_name, direction) in entries {
                if direction.is_null() {
                    continue;
                }
                let property = typ
                    .field(field_name)
                    .and_then(|field| field.property().map(|property| (field, property)));
                let Some((field, property)) = property else {
                    return Err(Neo4jExecutionError::Validation(
                        "sort".to_string(),
                        format!("Cannot sort {} by '{field_name}'", typ.name),
                    ));
                };
                fields.push(SortField {
                    target: property_target(field, property),
                    direction: ordering(direction)?,
                });
            }
        }
        Ok(fields)
    }
}

/// Which side of a relationship a connection sort applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionSide {
    Node,
    Edge,
}

impl ConnectionSide {
    /// The key under which an edge map holds this side
    pub fn key(self) -> &'static str {
        match self {
            ConnectionSide::Node => "node",
            ConnectionSide::Edge => "properties",
        }
    }
}

/// `sort: [{ node: { title: ASC } }, { edge: { role: DESC } }]` of a connection field
pub(crate) struct ConnectionSortInput {
    pub node_type: TypeId,
    pub edge_type: Option<TypeId>,
}

impl<'a> CypherMapper<'a, Vec<(ConnectionSide, SortField)>> for ConnectionSortInput {
    fn to_cypher(
        self,
        argument: &'a Val,
        translation: &Translation<'a>,
    ) -> Result<Vec<(ConnectionSide, SortField)>, Neo4jExecutionError> {
        let mut fields = vec![];
        for element in argument.as_list() {
            let Val::Object(entries) = element else {
                return Err(invalid("sort", element));
            };
            for (key, value) in entries {
                let (side, type_id) = match (key.as_str(), self.edge_type) {
                    ("node", _) => (ConnectionSide::Node, self.node_type),
                    ("edge", Some(edge_type)) => (ConnectionSide::Edge, edge_type),
                    _ => {
                        return Err(Neo4jExecutionError::Validation(
                            "sort".to_string(),
                            format!("Cannot sort a connection by '{key}'"),
                        ));
                    }
                };
                let side_fields = SortInput { type_id }.to_cypher(value, translation)?;
                fields.extend(side_fields.into_iter().map(|field| (side, field)));
            }
        }
        Ok(fields)
    }
}

fn ordering(argument: &Val) -> Result<SortDirection, Neo4jExecutionError> {
    match argument.as_str() {
        Some("ASC") => Ok(SortDirection::Asc),
        Some("DESC") => Ok(SortDirection::Desc),
        _ => Err(Neo4jExecutionError::Validation(
            "sort".to_string(),
            format!("Cannot match {} as valid ordering", argument.kind()),
        )),
    }
}

/// A `limit`/`offset`/`first` value as a parameter. An offset of zero is dropped.
pub(crate) fn pagination_param(
    name: &str,
    value: &Val,
    zero_is_absent: bool,
) -> Result<Option<Expression>, Neo4jExecutionError> {
    if value.is_null() {
        return Ok(None);
    }
    match value.as_i64() {
        Some(0) if zero_is_absent => Ok(None),
        Some(n) if n >= 0 => Ok(Some(Expression::param(CypherValue::Integer(n)))),
        _ => Err(Neo4jExecutionError::Validation(
            name.to_string(),
            format!("Expected a non-negative integer, got {}", value.kind()),
        )),
    }
}

fn invalid(name: &str, value: &Val) -> Neo4jExecutionError {
    Neo4jExecutionError::Validation(
        name.to_string(),
        format!("Invalid argument of kind {}", value.kind()),
    )
}
