// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{cell::Cell, rc::Rc};

use crate::Variable;

/// Source of variable names for one statement.
///
/// All scopes derived from the same root share a counter, so every generated name is unique
/// across the whole statement (not just within a subquery). Node variables are named `this0`,
/// `this1`, ... and other intermediate values `var0`, `var1`, ... drawing from the same sequence.
#[derive(Debug, Clone)]
pub struct IdentifierScope {
    counter: Rc<Cell<usize>>,
    depth: usize,
}

impl Default for IdentifierScope {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierScope {
    pub fn new() -> Self {
        Self {
            counter: Rc::new(Cell::new(0)),
            depth: 0,
        }
    }

    pub fn root_variable(&self) -> Variable {
        Variable::new("this")
    }

    pub fn fresh_node(&self) -> Variable {
        Variable::new(format!("this{}", self.next()))
    }

    pub fn fresh_var(&self) -> Variable {
        Variable::new(format!("var{}", self.next()))
    }

    /// A scope for a nested subquery
    pub fn child(&self) -> Self {
        Self {
            counter: self.counter.clone(),
            depth: self.depth + 1,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn next(&self) -> usize {
        let current = self.counter.get();
        self.counter.set(current + 1);
        current
    }
}
