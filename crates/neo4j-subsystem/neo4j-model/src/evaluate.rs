// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! In-memory evaluation of filters with Cypher's three-valued logic.
//!
//! `None` stands for Cypher's `null`: a comparison against a missing property is unknown, not
//! false. Relationship, connection and aggregate filters need the graph and always evaluate to
//! unknown, as do comparisons against unresolved JWT references.

use std::cmp::Ordering;

use regex::Regex;

use common::value::Val;

use crate::filter::{ComparisonOp, FilterExpression, FilterValue, PropertyComparison};

/// Something whose properties a filter can be evaluated against (a node, a set of JWT claims)
pub trait PropertySource {
    fn get_property(&self, name: &str) -> Option<&Val>;
}

impl PropertySource for indexmap::IndexMap<String, Val> {
    fn get_property(&self, name: &str) -> Option<&Val> {
        self.get(name)
    }
}

pub fn evaluate(filter: &FilterExpression, source: &impl PropertySource) -> Option<bool> {
    match filter {
        FilterExpression::And(filters) => {
            let results: Vec<_> = filters.iter().map(|filter| evaluate(filter, source)).collect();
            if results.contains(&Some(false)) {
                Some(false)
            } else if results.contains(&None) {
                None
            } else {
                Some(true)
            }
        }
        FilterExpression::Or(filters) => {
            let results: Vec<_> = filters.iter().map(|filter| evaluate(filter, source)).collect();
            if results.contains(&Some(true)) {
                Some(true)
            } else if results.contains(&None) {
                None
            } else {
                Some(false)
            }
        }
        FilterExpression::Not(filter) => evaluate(filter, source).map(|result| !result),
        FilterExpression::Comparison(comparison) => evaluate_comparison(comparison, source),
        FilterExpression::Relationship { .. }
        | FilterExpression::Connection { .. }
        | FilterExpression::Aggregate { .. } => None,
    }
}

fn evaluate_comparison(
    comparison: &PropertyComparison,
    source: &impl PropertySource,
) -> Option<bool> {
    let expected = match &comparison.value {
        FilterValue::Literal(value) => value,
        FilterValue::JwtClaim(_) => return None,
    };

    let property = &comparison.property;
    let actual = match source.get_property(&property.db_name) {
        Some(value) if !value.is_null() => Some(value),
        _ => property.coalesce.as_ref(),
    };

    match comparison.op {
        ComparisonOp::Eq if expected.is_null() => Some(actual.is_none()),
        ComparisonOp::Eq => values_equal(actual?, expected),
        ComparisonOp::In => {
            let actual = actual?;
            let mut unknown = false;
            for candidate in expected.as_list() {
                match values_equal(actual, candidate) {
                    Some(true) => return Some(true),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            (!unknown).then_some(false)
        }
        ComparisonOp::Includes => {
            let actual = actual?;
            let mut unknown = false;
            for element in actual.as_list() {
                match values_equal(element, expected) {
                    Some(true) => return Some(true),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            (!unknown).then_some(false)
        }
        ComparisonOp::Lt => compare(actual?, expected).map(Ordering::is_lt),
        ComparisonOp::Lte => compare(actual?, expected).map(Ordering::is_le),
        ComparisonOp::Gt => compare(actual?, expected).map(Ordering::is_gt),
        ComparisonOp::Gte => compare(actual?, expected).map(Ordering::is_ge),
        ComparisonOp::Contains => strings(actual?, expected).map(|(a, e)| a.contains(e)),
        ComparisonOp::StartsWith => strings(actual?, expected).map(|(a, e)| a.starts_with(e)),
        ComparisonOp::EndsWith => strings(actual?, expected).map(|(a, e)| a.ends_with(e)),
        ComparisonOp::Matches => {
            let (actual, pattern) = strings(actual?, expected)?;
            // `=~` matches the whole string
            let regex = Regex::new(&format!("^(?:{pattern})$")).ok()?;
            Some(regex.is_match(actual))
        }
    }
}

/// Cypher equality: numbers compare by value across integer and float, `null` is unknown
pub fn values_equal(left: &Val, right: &Val) -> Option<bool> {
    match (left, right) {
        (Val::Null, _) | (_, Val::Null) => None,
        (Val::Number(l), Val::Number(r)) => Some(l.partial_cmp(r) == Some(Ordering::Equal)),
        (Val::List(l), Val::List(r)) => {
            if l.len() != r.len() {
                return Some(false);
            }
            let mut unknown = false;
            for (l, r) in l.iter().zip(r) {
                match values_equal(l, r) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            (!unknown).then_some(true)
        }
        (l, r) => match (l.as_str(), r.as_str()) {
            (Some(l), Some(r)) => Some(l == r),
            _ => Some(l == r),
        },
    }
}

fn compare(left: &Val, right: &Val) -> Option<Ordering> {
    match (left, right) {
        (Val::Number(l), Val::Number(r)) => l.partial_cmp(r),
        (Val::String(l), Val::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn strings<'a>(actual: &'a Val, expected: &'a Val) -> Option<(&'a str, &'a str)> {
    match (actual, expected) {
        (Val::String(actual), Val::String(expected)) => Some((actual, expected)),
        _ => None,
    }
}
