// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

pub const EXO_LOG: &str = "EXO_LOG";

pub const EXO_CYPHER_MAX_NESTING_DEPTH: &str = "EXO_CYPHER_MAX_NESTING_DEPTH";
pub const EXO_CYPHER_VERSION_PREFIX: &str = "EXO_CYPHER_VERSION_PREFIX";
