// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use crate::{CypherFragment, CypherValue, ExpressionBuilder, Param};

const INDENT: &str = "    ";

pub struct CypherBuilder {
    /// The Cypher being built with `$name` placeholders for each parameter
    cypher: String,
    /// Parameters in the order of their first appearance
    params: IndexMap<String, CypherValue>,
    /// Anonymous parameters seen so far, along with the names assigned to them
    assigned: Vec<(Param, String)>,
    anonymous_count: usize,
    indent: usize,
}

impl Default for CypherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CypherBuilder {
    pub fn new() -> Self {
        Self {
            cypher: String::new(),
            params: IndexMap::new(),
            assigned: Vec::new(),
            anonymous_count: 0,
            indent: 0,
        }
    }

    /// Push a string
    pub fn push_str<T: AsRef<str>>(&mut self, s: T) {
        self.cypher.push_str(s.as_ref());
    }

    /// Push a character
    pub fn push(&mut self, c: char) {
        self.cypher.push(c);
    }

    /// Push a space. This is a common operation, so it is provided as a separate method.
    pub fn push_space(&mut self) {
        self.cypher.push(' ');
    }

    /// Push a name (variable, property key, label or relationship type), quoting it with backticks
    /// if it is not a plain identifier.
    pub fn push_identifier<T: AsRef<str>>(&mut self, name: T) {
        let name = name.as_ref();
        if is_plain_identifier(name) {
            self.cypher.push_str(name);
        } else {
            self.cypher.push('`');
            self.cypher.push_str(&name.replace('`', "``"));
            self.cypher.push('`');
        }
    }

    /// Push a double-quoted string literal.
    pub fn push_string_literal<T: AsRef<str>>(&mut self, s: T) {
        self.cypher.push('"');
        for c in s.as_ref().chars() {
            match c {
                '"' => self.cypher.push_str("\\\""),
                '\\' => self.cypher.push_str("\\\\"),
                '\n' => self.cypher.push_str("\\n"),
                '\r' => self.cypher.push_str("\\r"),
                '\t' => self.cypher.push_str("\\t"),
                c => self.cypher.push(c),
            }
        }
        self.cypher.push('"');
    }

    /// Start a new line at the current indentation level.
    pub fn new_line(&mut self) {
        self.cypher.push('\n');
        for _ in 0..self.indent {
            self.cypher.push_str(INDENT);
        }
    }

    /// Execute the given function one indentation level deeper.
    pub fn indented<F, R>(&mut self, func: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.indent += 1;
        let ret = func(self);
        self.indent -= 1;
        ret
    }

    /// Push a parameter reference and record its binding. An anonymous parameter is named
    /// `paramN` the first time it is pushed; pushing the same parameter again reuses the name.
    pub fn push_param(&mut self, param: &Param) {
        let name = match param.name() {
            Some(name) => {
                if !self.params.contains_key(name) {
                    self.params.insert(name.to_string(), param.value().clone());
                }
                name.to_string()
            }
            None => match self
                .assigned
                .iter()
                .find(|(assigned, _)| assigned.same_as(param))
            {
                Some((_, name)) => name.clone(),
                None => {
                    let name = format!("param{}", self.anonymous_count);
                    self.anonymous_count += 1;
                    self.params.insert(name.clone(), param.value().clone());
                    self.assigned.push((param.clone(), name.clone()));
                    name
                }
            },
        };

        self.cypher.push('$');
        self.push_identifier(name);
    }

    /// Push elements of an iterator, separated by `sep`. The `push_elem` function provides
    /// the flexibility to map the elements (compared to [`CypherBuilder::push_elems`], which assumes that
    /// the elements implement [`ExpressionBuilder`]).
    pub fn push_iter<T>(
        &mut self,
        iter: impl ExactSizeIterator<Item = T>,
        sep: &str,
        push_elem: impl Fn(&mut Self, T),
    ) {
        let len = iter.len();
        for (i, item) in iter.enumerate() {
            push_elem(self, item);

            if i + 1 < len {
                self.cypher.push_str(sep);
            }
        }
    }

    /// Push elements of a slice, separated by `sep`.
    pub fn push_elems<T: ExpressionBuilder>(&mut self, elems: &[T], sep: &str) {
        self.push_iter(elems.iter(), sep, |builder, elem| {
            elem.build(builder);
        });
    }

    /// Get the Cypher string and the parameter bindings. This should be the final step in
    /// building a statement, and thus consumes the builder.
    pub fn into_fragment(self) -> CypherFragment {
        CypherFragment {
            cypher: self.cypher,
            params: self.params,
        }
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted_only_when_needed() {
        let mut builder = CypherBuilder::new();
        builder.push_identifier("title");
        builder.push_space();
        builder.push_identifier("https://example.com/roles");
        builder.push_space();
        builder.push_identifier("odd`name");

        assert_binding!(
            builder.into_fragment(),
            "title `https://example.com/roles` `odd``name`"
        );
    }

    #[test]
    fn params_are_named_in_push_order_and_reused() {
        let first = Param::new("a");
        let second = Param::new(2);
        let jwt = Param::named("jwt", CypherValue::Null);

        let mut builder = CypherBuilder::new();
        builder.push_param(&second);
        builder.push_space();
        builder.push_param(&jwt);
        builder.push_space();
        builder.push_param(&first);
        builder.push_space();
        builder.push_param(&second.clone());
        builder.push_space();
        builder.push_param(&Param::named("jwt", CypherValue::Null));

        assert_binding!(
            builder.into_fragment(),
            "$param0 $jwt $param1 $param0 $jwt",
            "param0" => 2,
            "jwt" => CypherValue::Null,
            "param1" => "a"
        );
    }

    #[test]
    fn equal_values_in_distinct_params_are_not_merged() {
        let mut builder = CypherBuilder::new();
        builder.push_param(&Param::new(1));
        builder.push_space();
        builder.push_param(&Param::new(1));

        assert_binding!(builder.into_fragment(), "$param0 $param1", "param0" => 1, "param1" => 1);
    }

    #[test]
    fn string_literals_are_escaped() {
        let mut builder = CypherBuilder::new();
        builder.push_string_literal("say \"hi\"\n");
        assert_binding!(builder.into_fragment(), r#""say \"hi\"\n""#);
    }

    #[test]
    fn indentation() {
        let mut builder = CypherBuilder::new();
        builder.push_str("CALL {");
        builder.indented(|builder| {
            builder.new_line();
            builder.push_str("RETURN 1 AS x");
        });
        builder.new_line();
        builder.push('}');

        assert_binding!(builder.into_fragment(), "CALL {\n    RETURN 1 AS x\n}");
    }
}
