//! Construction of statement trees from raw YAML values.

use super::models::{RawRule, RuleDocument};
use crate::engine::{Rule, Statement};
use crate::error::{Result, RuleError};
use crate::features::Feature;
use serde_yaml::Value;
use std::path::Path;

/// Name used when a rule file declares no `meta.name` and has no usable file stem
pub const UNNAMED_RULE: &str = "unnamed_rule";

/// Longest YAML excerpt quoted in an error message
const SHAPE_EXCERPT_CHARS: usize = 80;

/// Parse the text of one rule file. `origin` names the source in errors and
/// supplies the fallback rule name.
pub fn parse_rule(text: &str, origin: &str) -> Result<Rule> {
    let document: RuleDocument =
        serde_yaml::from_str(text).map_err(|e| RuleError::yaml(origin, e))?;
    let RawRule { meta, features } = document.rule;

    if features.len() != 1 {
        return Err(RuleError::root_count(origin, features.len()));
    }
    let statement = parse_statement(&features[0], "features")?;

    let name = match meta.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            let fallback = fallback_name(origin);
            tracing::warn!("Rule in {} has no meta.name, using '{}'", origin, fallback);
            fallback
        }
    };

    Ok(Rule {
        name,
        namespace: meta.namespace,
        description: meta.description,
        statement,
    })
}

/// Build a statement from a single-key YAML mapping.
///
/// `path` locates the node inside the rule (e.g. `features/and[1]/not`) for
/// error messages.
pub fn parse_statement(value: &Value, path: &str) -> Result<Statement> {
    let mapping = match value {
        Value::Mapping(mapping) if mapping.len() == 1 => mapping,
        _ => return Err(RuleError::unknown_statement(path, describe(value))),
    };
    let Some((Value::String(key), operand)) = mapping.iter().next() else {
        return Err(RuleError::unknown_statement(path, describe(value)));
    };
    let child_path = format!("{}/{}", path, key);

    match key.as_str() {
        "and" | "or" => {
            let items = operand.as_sequence().ok_or_else(|| {
                RuleError::invalid_operand(&child_path, key.as_str(), "a list of statements")
            })?;
            let children = items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_statement(item, &format!("{}[{}]", child_path, i)))
                .collect::<Result<Vec<_>>>()?;
            if key.as_str() == "and" {
                Ok(Statement::and(children))
            } else {
                Ok(Statement::or(children))
            }
        }
        "not" => {
            if !operand.is_mapping() {
                return Err(RuleError::invalid_operand(&child_path, "not", "a single statement"));
            }
            Ok(Statement::not(parse_statement(operand, &child_path)?))
        }
        "api" => Ok(Statement::feature(Feature::api(scalar(operand, &child_path, "api")?))),
        "string" => Ok(Statement::feature(Feature::string(scalar(
            operand,
            &child_path,
            "string",
        )?))),
        _ => Err(RuleError::unknown_statement(path, describe(value))),
    }
}

fn scalar<'v>(operand: &'v Value, path: &str, key: &str) -> Result<&'v str> {
    operand
        .as_str()
        .ok_or_else(|| RuleError::invalid_operand(path, key, "a string"))
}

fn fallback_name(origin: &str) -> String {
    Path::new(origin)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNNAMED_RULE)
        .to_string()
}

/// One-line excerpt of a YAML value
fn describe(value: &Value) -> String {
    let rendered = serde_yaml::to_string(value).unwrap_or_else(|_| "<unprintable>".to_string());
    let flat = rendered.trim().replace('\n', " ");
    if flat.chars().count() > SHAPE_EXCERPT_CHARS {
        let mut cut: String = flat.chars().take(SHAPE_EXCERPT_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        flat
    }
}
