// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::value::Val;
use indexmap::IndexMap;

/// The decoded payload of the caller's JWT.
///
/// Verification happens before translation, so this is just the claims object.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtClaims {
    claims: IndexMap<String, Val>,
}

impl JwtClaims {
    pub fn new(claims: IndexMap<String, Val>) -> Self {
        Self { claims }
    }

    /// Claims from a JSON object. Anything other than an object yields `None`.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match Val::from(value) {
            Val::Object(claims) => Some(Self::new(claims)),
            _ => None,
        }
    }

    /// Look up a claim by path.
    ///
    /// A key that exists verbatim wins (claims such as `https://example.com/roles` contain dots);
    /// otherwise the path is split on `.` and followed through nested objects.
    pub fn get_path(&self, path: &str) -> Option<&Val> {
        if let Some(value) = self.claims.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.claims.get(first)?, |value, segment| value.get(segment))
    }

    /// Is there a top-level claim with exactly this name?
    pub fn contains_key(&self, key: &str) -> bool {
        self.claims.contains_key(key)
    }

    pub fn as_val(&self) -> Val {
        Val::Object(self.claims.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_lookup() {
        let claims = JwtClaims::from_json(serde_json::json!({
            "sub": "user-1",
            "https://example.com/roles": ["admin"],
            "org": { "id": 7, "team": { "name": "core" } }
        }))
        .unwrap();

        assert_eq!(claims.get_path("sub"), Some(&Val::from("user-1")));
        assert_eq!(
            claims.get_path("https://example.com/roles").map(|v| v.as_list().len()),
            Some(1)
        );
        assert_eq!(claims.get_path("org.id").and_then(Val::as_i64), Some(7));
        assert_eq!(claims.get_path("org.team.name"), Some(&Val::from("core")));
        assert_eq!(claims.get_path("org.missing"), None);
        assert_eq!(claims.get_path("missing"), None);

        assert!(JwtClaims::from_json(serde_json::json!("token")).is_none());
    }
}
