//! Line-by-line processing of parameter definitions and expressions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spiceval_core::format_value;
use spiceval_expr::{EvalContext, Evaluate, Evaluation, ParseOptions, Value, parse_expression_with};
use spiceval_param::{ParamTable, SubstOptions, Substituter, extract_params};

/// Settings read from a `--config` JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub subst: SubstOptions,
    pub parse: ParseOptions,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid configuration")
    }
}

/// What to write for each expression line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Evaluate and print the value.
    Value,
    /// Print the parsed tree with minimal parentheses.
    Tree,
}

/// Parameter table plus settings, carried across lines.
pub struct Session {
    table: ParamTable,
    config: Config,
    output: Output,
}

impl Session {
    pub fn new(config: Config, output: Output) -> Self {
        Self {
            table: ParamTable::new(),
            config,
            output,
        }
    }

    pub fn table(&self) -> &ParamTable {
        &self.table
    }

    /// Process one input line. Definitions and blank or comment lines
    /// produce no output.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('*') {
            return Ok(None);
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with(".param") || lower.starts_with("params:") {
            extract_params(&mut self.table, line, &self.config.subst)
                .with_context(|| format!("Failed to read parameters: {line}"))?;
            log::info!("{} parameters defined", self.table.len());
            return Ok(None);
        }

        let text = Substituter::new(&mut self.table)
            .with_options(self.config.subst.clone())
            .line_subst(line)
            .with_context(|| format!("Substitution failed: {line}"))?;
        let tree = parse_expression_with(&text, self.config.parse.clone())
            .with_context(|| format!("Parse error in: {text}"))?;

        match self.output {
            Output::Tree => Ok(Some(tree.to_string())),
            Output::Value => {
                let evaluation = EvalContext::new()
                    .evaluate(&tree)
                    .with_context(|| format!("Evaluation failed: {tree}"))?;
                Ok(Some(match evaluation {
                    Evaluation::Resolved(value) => format_result(&value),
                    Evaluation::Unresolved => tree.to_string(),
                }))
            }
        }
    }
}

fn format_result(value: &Value) -> String {
    match value {
        Value::Real(x) => format_value(*x),
        Value::Vector(items) => {
            let items: Vec<String> = items.iter().map(|x| format_value(*x)).collect();
            format!("[{}]", items.join(", "))
        }
    }
}
