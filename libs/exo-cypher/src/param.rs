// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use crate::CypherValue;

/// A parameter placed in a statement.
///
/// Anonymous parameters get their name (`paramN`) when the statement is rendered. Two clones of
/// the same `Param` denote the same logical value and share one name; two separately created
/// params never do, even if their values are equal. Named parameters (such as `jwt`) keep their
/// name and are bound once regardless of how many times they are referenced.
#[derive(Debug, Clone)]
pub struct Param {
    inner: Arc<ParamInner>,
}

#[derive(Debug)]
struct ParamInner {
    name: Option<String>,
    value: CypherValue,
}

impl Param {
    pub fn new(value: impl Into<CypherValue>) -> Self {
        Self {
            inner: Arc::new(ParamInner {
                name: None,
                value: value.into(),
            }),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<CypherValue>) -> Self {
        Self {
            inner: Arc::new(ParamInner {
                name: Some(name.into()),
                value: value.into(),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn value(&self) -> &CypherValue {
        &self.inner.value
    }

    pub(crate) fn same_as(&self, other: &Param) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        match (self.name(), other.name()) {
            (Some(left), Some(right)) => left == right,
            _ => self.same_as(other),
        }
    }
}
