//! Output formatting and reporting.
//!
//! This module handles formatting results for the two output modes:
//! - Human-readable terminal output with colors
//! - JSON output for machine consumption (one document per report,
//!   one line per detection while watching)

use crate::engine::{MatchReport, MatchResult};
use crate::extractor::Statistics;
use crate::features::Address;
use crate::rules::RuleSet;
use crate::watch::Detection;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct JsonMatch<'r, 'a> {
    rule: &'r str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'r str>,
    address: &'r Address,
    locations: Vec<&'r Address>,
    result: &'r MatchResult<'a>,
}

#[derive(Serialize)]
struct JsonReport<'r, 'a> {
    count: usize,
    matches: Vec<JsonMatch<'r, 'a>>,
}

#[derive(Serialize)]
struct JsonRule<'r> {
    name: &'r str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'r str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'r str>,
    statement: String,
}

#[derive(Serialize)]
struct JsonFailure {
    path: String,
    error: String,
}

#[derive(Serialize)]
struct JsonRules<'r> {
    rules: Vec<JsonRule<'r>>,
    failures: Vec<JsonFailure>,
}

fn namespace_of<'r>(rules: &'r RuleSet, result: &MatchResult) -> Option<&'r str> {
    rules
        .owner_of(result.statement)
        .and_then(|r| r.namespace.as_deref())
}

fn format_locations(locations: &[&Address]) -> String {
    locations
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render matched rules, optionally with the evaluated result tree
pub fn format_report_terminal(report: &MatchReport, rules: &RuleSet, explain: bool) -> String {
    let mut output = String::new();

    if report.is_empty() {
        output.push_str(&format!("├─ {}\n", "No capabilities detected".bright_white()));
        output.push_str("│\n");
        return output;
    }

    for (name, entries) in report {
        let header_ns = entries
            .first()
            .and_then(|(_, result)| namespace_of(rules, result));
        let header = match header_ns {
            Some(ns) => format!("{} {}", name.bright_red(), format!("({})", ns).bright_black()),
            None => name.bright_red().to_string(),
        };
        output.push_str(&format!("├─ {}\n", header));

        for (address, result) in entries {
            // Same-named rules from another namespace are marked per entry
            let entry_ns = namespace_of(rules, result);
            match entry_ns {
                Some(ns) if entry_ns != header_ns => output.push_str(&format!(
                    "│     at {} {}\n",
                    address.as_str().bright_white(),
                    format!("({})", ns).bright_black()
                )),
                _ => output.push_str(&format!("│     at {}\n", address.as_str().bright_white())),
            }
            let locations = result.leaf_locations();
            if !locations.is_empty() {
                output.push_str(&format!(
                    "│     via {}\n",
                    format_locations(&locations).bright_black()
                ));
            }
            if explain {
                for line in result.explain().lines() {
                    output.push_str(&format!("│       {}\n", line.bright_cyan()));
                }
            }
        }
        output.push_str("│\n");
    }

    output
}

pub fn format_report_json(report: &MatchReport, rules: &RuleSet) -> Result<String> {
    let matches: Vec<JsonMatch> = report
        .iter()
        .flat_map(|(name, entries)| {
            entries.iter().map(move |(address, result)| JsonMatch {
                rule: name,
                namespace: namespace_of(rules, result),
                address,
                locations: result.leaf_locations(),
                result,
            })
        })
        .collect();

    let document = JsonReport {
        count: matches.len(),
        matches,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn format_detection_terminal(detection: &Detection) -> String {
    let mut output = format!(
        "{} {}",
        "[+] Detected capability:".bright_green(),
        detection.rule.bright_white()
    );
    if let Some(ref ns) = detection.namespace {
        output.push_str(&format!(" {}", format!("({})", ns).bright_black()));
    }
    output.push_str(&format!("\n    - Triggered at {}\n", detection.address));
    if !detection.locations.is_empty() {
        let locations: Vec<&Address> = detection.locations.iter().collect();
        output.push_str(&format!(
            "    - Observed at {}\n",
            format_locations(&locations).bright_black()
        ));
    }
    output
}

/// One JSON line per detection
pub fn format_detection_json(detection: &Detection) -> Result<String> {
    Ok(serde_json::to_string(detection)?)
}

pub fn format_statistics_terminal(stats: &Statistics) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}\n", "=== API Call Statistics ===".bright_white()));
    output.push_str(&format!("Total unique features: {}\n", stats.unique_features));
    output.push_str(&format!("Total feature locations: {}\n", stats.total_locations));

    if !stats.top.is_empty() {
        output.push_str("\nTop features by location count:\n");
        for (i, (feature, count)) in stats.top.iter().enumerate() {
            output.push_str(&format!("{}. {}: {}\n", i + 1, feature, count));
        }
    }
    output.push_str("===========================\n");
    output
}

pub fn format_statistics_json(stats: &Statistics) -> Result<String> {
    Ok(serde_json::to_string(&serde_json::json!({ "statistics": stats }))?)
}

/// List loaded rules and the files that failed to load
pub fn format_rules_terminal(rules: &RuleSet) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Loaded {} rules\n",
        rules.len().to_string().bright_white()
    ));

    for rule in rules.rules() {
        let ns = rule
            .namespace
            .as_deref()
            .map(|ns| format!(" ({})", ns).bright_black().to_string())
            .unwrap_or_default();
        output.push_str(&format!("├─ {}{}\n", rule.name.bright_cyan(), ns));
        output.push_str(&format!("│     {}\n", rule.statement));
    }

    if !rules.failures().is_empty() {
        output.push_str(&format!(
            "\n{} rule files failed to load:\n",
            rules.failures().len().to_string().bright_red()
        ));
        for failure in rules.failures() {
            output.push_str(&format!(
                "  {} {}: {}\n",
                "✗".bright_red(),
                failure.path.display(),
                failure.error
            ));
        }
    }
    output
}

pub fn format_rules_json(rules: &RuleSet) -> Result<String> {
    let document = JsonRules {
        rules: rules
            .rules()
            .iter()
            .map(|r| JsonRule {
                name: &r.name,
                namespace: r.namespace.as_deref(),
                description: r.description.as_deref(),
                statement: r.statement.to_string(),
            })
            .collect(),
        failures: rules
            .failures()
            .iter()
            .map(|f| JsonFailure {
                path: f.path.display().to_string(),
                error: f.error.to_string(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}
