// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::types::TypeId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootOperation {
    /// `movies(where:, options:)`
    Read,
    /// `moviesAggregate(where:)`
    Aggregate,
    /// `createMovies(input:)`
    Create,
    /// `updateMovies(where:, update:, connect:, ...)`
    Update,
    /// `deleteMovies(where:, delete:)`
    Delete,
}

impl RootOperation {
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            RootOperation::Create | RootOperation::Update | RootOperation::Delete
        )
    }
}

/// An entry of the root-field dispatch table
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RootField {
    pub name: String,
    pub type_id: TypeId,
    pub operation: RootOperation,
}
