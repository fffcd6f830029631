// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::CypherValue;

/// A piece of Cypher text together with the bindings for the parameters it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CypherFragment {
    pub cypher: String,
    pub params: IndexMap<String, CypherValue>,
}

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Parameter '{0}' is bound to different values in the fragments being joined")]
    ConflictingParam(String),
}

impl CypherFragment {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: IndexMap::new(),
        }
    }

    /// Concatenate two fragments with `separator` in between and merge their parameters. A
    /// parameter present in both must carry the same value in each.
    pub fn join(mut self, other: CypherFragment, separator: &str) -> Result<Self, FragmentError> {
        if !self.cypher.is_empty() && !other.cypher.is_empty() {
            self.cypher.push_str(separator);
        }
        self.cypher.push_str(&other.cypher);

        for (name, value) in other.params {
            match self.params.get(&name) {
                Some(existing) if existing != &value => {
                    return Err(FragmentError::ConflictingParam(name));
                }
                Some(_) => {}
                None => {
                    self.params.insert(name, value);
                }
            }
        }

        Ok(self)
    }

    /// Parameters as a JSON object, in the form the execution collaborator passes to the driver.
    pub fn params_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.params
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_merges_text_and_params() {
        let prefix = CypherFragment::new("CYPHER 5");
        let mut body = CypherFragment::new("RETURN $param0 AS x");
        body.params.insert("param0".into(), CypherValue::from(1));

        let joined = prefix.join(body, "\n").unwrap();
        assert_binding!(joined, "CYPHER 5\nRETURN $param0 AS x", "param0" => 1);
    }

    #[test]
    fn join_rejects_conflicting_bindings() {
        let mut left = CypherFragment::new("RETURN $param0");
        left.params.insert("param0".into(), CypherValue::from(1));
        let mut right = CypherFragment::new("RETURN $param0");
        right.params.insert("param0".into(), CypherValue::from(2));

        assert!(left.join(right, " UNION ").is_err());
    }
}
