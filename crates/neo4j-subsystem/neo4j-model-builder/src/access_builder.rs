// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Build `@authorization`/`@authentication` annotations and the `@jwt` claim declarations.
//!
//! Rules are parsed against the finished types (so `node` filters may cross relationships), and
//! then attached to the types in a separate step.

use async_graphql_parser::types::TypeKind as SdlTypeKind;
use indexmap::IndexMap;

use common::value::Val;
use neo4j_model::{
    access::{
        AuthOperation, AuthPredicate, AuthenticationAnnotation, AuthorizationAnnotation,
        FilterRule, ValidateRule, ValidationTiming,
    },
    filter_parser::FilterParser,
    schema::{JwtClaimField, JwtDescriptor, Neo4jSchema},
    types::TypeId,
};

use crate::{
    directives::{Directive, Directives, JWT_FIELD_DIRECTIVES},
    error::SchemaError,
    field_builder::field_type,
    type_builder::SchemaBuilding,
};

const FILTER_RULE_KEYS: [&str; 3] = ["operations", "requireAuthentication", "where"];
const VALIDATE_RULE_KEYS: [&str; 4] = ["operations", "requireAuthentication", "when", "where"];

pub(crate) fn build_jwt(building: &mut SchemaBuilding) -> Result<(), SchemaError> {
    let Some(definition) = building.jwt_definition else {
        return Ok(());
    };
    let type_name = definition.name.node.as_str();
    let SdlTypeKind::Object(object) = &definition.kind else {
        return Ok(());
    };

    let claims = object
        .fields
        .iter()
        .map(|field| {
            let field = &field.node;
            let field_name = field.name.node.as_str();
            let directives = Directives::new(&field.directives, type_name, Some(field_name));
            directives.check_known(&JWT_FIELD_DIRECTIVES)?;

            let unknown_type = |name: &str| SchemaError::UnknownType {
                name: name.to_string(),
                referenced_by: format!("{type_name}.{field_name}"),
            };
            let typ = field_type(&field.ty.node).ok_or_else(|| unknown_type(field_name))?;
            let scalar = building
                .scalar_type(&typ.type_name)
                .ok_or_else(|| unknown_type(&typ.type_name))?;
            let path = match directives.get("jwtClaim") {
                Some(claim) => claim.required_string("path")?,
                None => field_name.to_string(),
            };

            Ok(JwtClaimField {
                name: field_name.to_string(),
                path,
                scalar,
                list: typ.list,
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    building.schema.jwt = Some(JwtDescriptor { claims });
    Ok(())
}

struct TypeAccess {
    type_id: TypeId,
    authorization: Option<AuthorizationAnnotation>,
    authentication: Option<AuthenticationAnnotation>,
    fields: Vec<(String, AuthorizationAnnotation)>,
}

pub(crate) fn build_access(building: &mut SchemaBuilding) -> Result<(), SchemaError> {
    let mut access = vec![];

    for (type_id, typ) in building.schema.types.iter() {
        let Some(definition) = building.definitions.get(&typ.name) else {
            continue;
        };
        let directives = Directives::new(&definition.directives, &typ.name, None);

        let authorization = directives
            .get("authorization")
            .map(|directive| build_authorization(&building.schema, type_id, &directive))
            .transpose()?;
        let authentication = directives
            .get("authentication")
            .map(|directive| {
                Ok::<_, SchemaError>(AuthenticationAnnotation {
                    operations: directive.enum_list_with(
                        "operations",
                        &AuthOperation::ALL,
                        AuthOperation::from_name,
                    )?,
                })
            })
            .transpose()?;

        let mut fields = vec![];
        for field in building.effective_fields(&typ.name) {
            let field_name = field.definition.name.node.as_str();
            let directives = Directives::new(field.directives, &typ.name, Some(field_name));
            if let Some(directive) = directives.get("authorization") {
                fields.push((
                    field_name.to_string(),
                    build_authorization(&building.schema, type_id, &directive)?,
                ));
            }
        }

        access.push(TypeAccess {
            type_id,
            authorization,
            authentication,
            fields,
        });
    }

    for type_access in access {
        let typ = &mut building.schema.types[type_access.type_id];
        typ.authorization = type_access.authorization;
        typ.authentication = type_access.authentication;

        for (field_name, authorization) in type_access.fields {
            if let Some(field) = typ.fields.iter_mut().find(|field| field.name == field_name) {
                field.authorization = Some(authorization);
            }
        }
    }

    Ok(())
}

fn build_authorization(
    schema: &Neo4jSchema,
    type_id: TypeId,
    directive: &Directive,
) -> Result<AuthorizationAnnotation, SchemaError> {
    let invalid = |message: String| SchemaError::InvalidAuthorization {
        type_name: schema.types[type_id].name.clone(),
        message,
    };
    let parser = FilterParser::with_jwt_references(schema);

    let filter = rules(directive, "filter")?
        .iter()
        .map(|rule| {
            let rule = rule_fields(rule, &FILTER_RULE_KEYS)?;
            Ok(FilterRule {
                operations: operations(rule, &AuthOperation::FILTER_DEFAULT)?,
                require_authentication: require_authentication(rule)?,
                predicate: predicate(&parser, type_id, rule)?,
            })
        })
        .collect::<Result<Vec<_>, String>>()
        .map_err(invalid)?;

    let validate = rules(directive, "validate")?
        .iter()
        .map(|rule| {
            let rule = rule_fields(rule, &VALIDATE_RULE_KEYS)?;
            Ok(ValidateRule {
                operations: operations(rule, &AuthOperation::ALL)?,
                when: timing(rule)?,
                require_authentication: require_authentication(rule)?,
                predicate: predicate(&parser, type_id, rule)?,
            })
        })
        .collect::<Result<Vec<_>, String>>()
        .map_err(invalid)?;

    Ok(AuthorizationAnnotation { filter, validate })
}

fn rules(directive: &Directive, name: &str) -> Result<Vec<Val>, SchemaError> {
    match directive.value(name)? {
        None | Some(Val::Null) => Ok(vec![]),
        Some(Val::List(rules)) => Ok(rules),
        Some(rule @ Val::Object(_)) => Ok(vec![rule]),
        Some(_) => Err(directive.error(format!("'{name}' must be a list of rules"))),
    }
}

fn rule_fields<'a>(rule: &'a Val, allowed: &[&str]) -> Result<&'a IndexMap<String, Val>, String> {
    let fields = rule
        .as_object()
        .ok_or_else(|| "a rule must be an object".to_string())?;

    match fields.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(format!("unknown rule argument '{key}'")),
        None => Ok(fields),
    }
}

fn enum_names<'a>(value: &'a Val, name: &str) -> Result<Vec<&'a str>, String> {
    value
        .as_list()
        .iter()
        .map(|element| {
            element
                .as_str()
                .ok_or_else(|| format!("'{name}' must be a list of enum values"))
        })
        .collect()
}

fn operations(
    rule: &IndexMap<String, Val>,
    default: &[AuthOperation],
) -> Result<Vec<AuthOperation>, String> {
    match rule.get("operations") {
        None | Some(Val::Null) => Ok(default.to_vec()),
        Some(value) => enum_names(value, "operations")?
            .into_iter()
            .map(|name| {
                AuthOperation::from_name(name).ok_or_else(|| format!("unknown operation '{name}'"))
            })
            .collect(),
    }
}

fn timing(rule: &IndexMap<String, Val>) -> Result<Vec<ValidationTiming>, String> {
    match rule.get("when") {
        None | Some(Val::Null) => Ok(vec![ValidationTiming::Before, ValidationTiming::After]),
        Some(value) => enum_names(value, "when")?
            .into_iter()
            .map(|name| match name {
                "BEFORE" => Ok(ValidationTiming::Before),
                "AFTER" => Ok(ValidationTiming::After),
                _ => Err(format!("unknown timing '{name}'")),
            })
            .collect(),
    }
}

fn require_authentication(rule: &IndexMap<String, Val>) -> Result<bool, String> {
    match rule.get("requireAuthentication") {
        None | Some(Val::Null) => Ok(true),
        Some(Val::Bool(value)) => Ok(*value),
        Some(_) => Err("'requireAuthentication' must be a boolean".to_string()),
    }
}

fn predicate(
    parser: &FilterParser,
    type_id: TypeId,
    rule: &IndexMap<String, Val>,
) -> Result<AuthPredicate, String> {
    let where_value = rule
        .get("where")
        .ok_or_else(|| "a rule needs a 'where'".to_string())?;

    parser
        .parse_auth_where(type_id, where_value)
        .map_err(|error| error.to_string())
}
