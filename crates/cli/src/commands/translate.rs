// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Write, fs, path::Path, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{ArgMatches, Command};
use serde_json::{Map, Value};
use tracing::debug;

use common::value::Val;
use core_resolver::{context::JwtClaims, validation::document_validator::DocumentValidator};
use exo_env::SystemEnvironment;
use neo4j_resolver::{
    CypherTranslator, Neo4jExecutionError, TranslatedStatement, TranslationContext,
    TranslatorConfig,
};

use super::command::{
    CommandDefinition, get, get_required, json_file_arg, operation_file_arg, operation_name_arg,
    schema_file_arg,
};

pub(crate) struct TranslateCommandDefinition {}

impl CommandDefinition for TranslateCommandDefinition {
    fn command(&self) -> Command {
        Command::new("translate")
            .about("Print the Cypher statement and parameters of each root field of an operation")
            .arg(schema_file_arg())
            .arg(operation_file_arg())
            .arg(json_file_arg(
                "variables",
                "A JSON file with the values of the operation's variables.",
            ))
            .arg(json_file_arg(
                "jwt",
                "A JSON file with the claims of the caller. Without it the caller is anonymous.",
            ))
            .arg(json_file_arg(
                "callbacks",
                "A JSON file with the values of `@populatedBy` callbacks, keyed by callback name.",
            ))
            .arg(operation_name_arg())
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let schema_path: PathBuf = get_required(matches, "schema")?;
        let operation_path: PathBuf = get_required(matches, "operation")?;

        let sdl = read(&schema_path)?;
        let schema = neo4j_model_builder::build_from_sdl(&sdl)
            .with_context(|| format!("Invalid schema in {}", schema_path.display()))?;

        let variables = get::<PathBuf>(matches, "variables")
            .map(|path| read_object(&path))
            .transpose()?;
        let operation = DocumentValidator::new(get(matches, "operation-name"), variables, usize::MAX)
            .validate_str(&read(&operation_path)?)
            .with_context(|| format!("Invalid operation in {}", operation_path.display()))?;

        let claims = get::<PathBuf>(matches, "jwt")
            .map(|path| {
                JwtClaims::from_json(Value::Object(read_object(&path)?))
                    .ok_or_else(|| anyhow!("The claims in {} are not an object", path.display()))
            })
            .transpose()?;
        let mut context = TranslationContext::new(claims);
        if let Some(path) = get::<PathBuf>(matches, "callbacks") {
            for (name, value) in read_object(&path)? {
                context = context.with_callback(&name, Val::from(value));
            }
        }

        let config = TranslatorConfig::from_env(&SystemEnvironment)?;
        debug!(?config, "Translating {}", operation_path.display());

        let results = CypherTranslator::new(&schema, config).translate_operation(&operation, &context);
        print!("{}", render(&results)?);

        let failed = results.iter().filter(|(_, result)| result.is_err()).count();
        if failed > 0 {
            return Err(anyhow!(
                "{failed} of {} root fields could not be translated",
                results.len()
            ));
        }
        Ok(())
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    match serde_json::from_str(&read(path)?)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?
    {
        Value::Object(entries) => Ok(entries),
        _ => Err(anyhow!("Expected a JSON object in {}", path.display())),
    }
}

/// One section per root field: its name, then the statement and its parameters (or the error)
fn render(results: &[(String, Result<TranslatedStatement, Neo4jExecutionError>)]) -> Result<String> {
    let mut output = String::new();
    for (name, result) in results {
        writeln!(output, "// {name}")?;
        match result {
            Ok(statement) => {
                writeln!(output, "{}", statement.cypher)?;
                writeln!(output, "// params")?;
                writeln!(
                    output,
                    "{}",
                    serde_json::to_string_pretty(&statement.to_fragment().params_json())?
                )?;
            }
            Err(error) => writeln!(output, "// error: {error}")?,
        }
        writeln!(output)?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::types::OperationType;
    use serde_json::json;

    use super::*;

    #[test]
    fn rendered_sections() {
        let schema = neo4j_model_builder::build_from_sdl("type Movie { title: String! }").unwrap();
        let operation = DocumentValidator::default()
            .validate_str(r#"{ movies(where: { title: "Up" }) { title } other: movies(where: { rating: 1 }) { title } }"#)
            .unwrap();
        assert_eq!(operation.typ, OperationType::Query);

        let results = CypherTranslator::new(&schema, TranslatorConfig::default())
            .translate_operation(&operation, &TranslationContext::default());
        let rendered = render(&results).unwrap();

        let (first, second) = rendered.split_once("\n\n").unwrap();
        assert_eq!(
            first,
            format!(
                "// movies\nMATCH (this:Movie)\nWHERE this.title = $param0\nRETURN this {{ .title }} AS this\n// params\n{}",
                serde_json::to_string_pretty(&json!({ "param0": "Up" })).unwrap()
            )
        );
        assert!(second.starts_with("// other\n// error: "), "{second}");
    }
}
