// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::env_const::{EXO_CYPHER_MAX_NESTING_DEPTH, EXO_CYPHER_VERSION_PREFIX};
use exo_env::{EnvError, Environment};
use thiserror::Error;

const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Bound on nested selections and nested mutation inputs
    pub max_nesting_depth: usize,
    /// Prefix every statement with `CYPHER 5`
    pub version_prefix: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            version_prefix: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Env(#[from] EnvError),

    #[error("{0} must be at least 1")]
    ZeroDepth(&'static str),
}

impl TranslatorConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, ConfigError> {
        let max_nesting_depth =
            env.get_usize(EXO_CYPHER_MAX_NESTING_DEPTH, DEFAULT_MAX_NESTING_DEPTH)?;
        if max_nesting_depth == 0 {
            return Err(ConfigError::ZeroDepth(EXO_CYPHER_MAX_NESTING_DEPTH));
        }

        Ok(Self {
            max_nesting_depth,
            version_prefix: env.enabled(EXO_CYPHER_VERSION_PREFIX, false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use exo_env::MapEnvironment;

    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = TranslatorConfig::from_env(&MapEnvironment::default()).unwrap();
        assert_eq!(config, TranslatorConfig::default());

        let env = MapEnvironment::from([
            (EXO_CYPHER_MAX_NESTING_DEPTH, "8"),
            (EXO_CYPHER_VERSION_PREFIX, "true"),
        ]);
        let config = TranslatorConfig::from_env(&env).unwrap();
        assert_eq!(config.max_nesting_depth, 8);
        assert!(config.version_prefix);
    }

    #[test]
    fn invalid_values() {
        let env = MapEnvironment::from([(EXO_CYPHER_MAX_NESTING_DEPTH, "deep")]);
        assert!(matches!(
            TranslatorConfig::from_env(&env),
            Err(ConfigError::Env(EnvError::InvalidNumber { .. }))
        ));

        let env = MapEnvironment::from([(EXO_CYPHER_MAX_NESTING_DEPTH, "0")]);
        assert!(matches!(
            TranslatorConfig::from_env(&env),
            Err(ConfigError::ZeroDepth(_))
        ));

        let env = MapEnvironment::from([(EXO_CYPHER_VERSION_PREFIX, "sometimes")]);
        assert!(matches!(
            TranslatorConfig::from_env(&env),
            Err(ConfigError::Env(EnvError::InvalidBoolean { .. }))
        ));
    }
}
