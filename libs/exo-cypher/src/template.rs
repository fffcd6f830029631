// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{CypherBuilder, ExpressionBuilder, Param};

static PARAMETER_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unknown parameter '${0}' in statement")]
    UnknownParameter(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Param(Param),
}

/// Statement text written by a schema author, with its `$name` references replaced by bound
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub parts: Vec<TemplatePart>,
}

impl Template {
    /// Names of all `$name` references in the statement, in order of appearance (with repetition).
    pub fn parameter_names(statement: &str) -> Vec<String> {
        PARAMETER_REFERENCE
            .captures_iter(statement)
            .map(|captures| captures[1].to_string())
            .collect()
    }

    /// Split the statement around its parameter references, resolving each through `resolve`.
    pub fn parse<E>(
        statement: &str,
        mut resolve: impl FnMut(&str) -> Result<Param, E>,
    ) -> Result<Template, E> {
        let mut parts = vec![];
        let mut last = 0;

        for captures in PARAMETER_REFERENCE.captures_iter(statement) {
            let whole = captures.get(0).map(|m| (m.start(), m.end()));
            if let Some((start, end)) = whole {
                if start > last {
                    parts.push(TemplatePart::Text(statement[last..start].to_string()));
                }
                parts.push(TemplatePart::Param(resolve(&captures[1])?));
                last = end;
            }
        }

        if last < statement.len() {
            parts.push(TemplatePart::Text(statement[last..].to_string()));
        }

        Ok(Template { parts })
    }
}

impl ExpressionBuilder for Template {
    /// Re-indent the author's text to the current nesting level, one source line per output line.
    fn build(&self, builder: &mut CypherBuilder) {
        let mut at_line_start = true;
        let mut pending_new_line = false;

        for part in &self.parts {
            match part {
                TemplatePart::Text(text) => {
                    for (i, line) in text.split('\n').enumerate() {
                        if i > 0 {
                            pending_new_line = !at_line_start || pending_new_line;
                            at_line_start = true;
                        }
                        let line = if at_line_start { line.trim_start() } else { line };
                        let line = line.trim_end_matches('\r');
                        if line.trim().is_empty() && at_line_start {
                            continue;
                        }
                        if pending_new_line {
                            builder.new_line();
                            pending_new_line = false;
                        }
                        builder.push_str(line);
                        at_line_start = false;
                    }
                }
                TemplatePart::Param(param) => {
                    if pending_new_line {
                        builder.new_line();
                        pending_new_line = false;
                    }
                    builder.push_param(param);
                    at_line_start = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_names_in_order() {
        assert_eq!(
            Template::parameter_names("MATCH (m) WHERE m.year > $minYear AND m.owner = $jwt.sub"),
            vec!["minYear".to_string(), "jwt".to_string()]
        );
    }

    #[test]
    fn parse_and_reindent() {
        let min_year = Param::new(2000);
        let template = Template::parse(
            "
            MATCH (this)-[:ACTED_IN]->(m:Movie)
              WHERE m.year > $minYear
            RETURN m AS result
            ",
            |name| match name {
                "minYear" => Ok(min_year.clone()),
                other => Err(TemplateError::UnknownParameter(other.to_string())),
            },
        )
        .unwrap();

        let mut builder = CypherBuilder::new();
        builder.push_str("CALL {");
        builder.indented(|builder| {
            builder.new_line();
            template.build(builder);
        });
        builder.new_line();
        builder.push('}');

        assert_binding!(
            builder.into_fragment(),
            "CALL {\n    MATCH (this)-[:ACTED_IN]->(m:Movie)\n    WHERE m.year > $param0\n    RETURN m AS result\n}",
            "param0" => 2000
        );
    }

    #[test]
    fn unknown_parameter() {
        let result = Template::parse("RETURN $missing", |name| {
            Err::<Param, _>(TemplateError::UnknownParameter(name.to_string()))
        });
        assert!(matches!(result, Err(TemplateError::UnknownParameter(name)) if name == "missing"));
    }
}
