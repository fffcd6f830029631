// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use common::value::Val;
use core_resolver::context::JwtClaims;

/// Per-request input to a translation. Passed by reference through every builder, never stored
/// in shared state, so concurrent translations can't observe each other's claims.
#[derive(Debug, Clone, Default)]
pub struct TranslationContext {
    /// `None` for unauthenticated callers
    pub claims: Option<JwtClaims>,
    /// Values for `@populatedBy(callback:)` fields, keyed by callback name
    pub callbacks: IndexMap<String, Val>,
}

impl TranslationContext {
    pub fn new(claims: Option<JwtClaims>) -> Self {
        Self {
            claims,
            callbacks: IndexMap::new(),
        }
    }

    pub fn with_callback(mut self, name: &str, value: Val) -> Self {
        self.callbacks.insert(name.to_string(), value);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }
}
