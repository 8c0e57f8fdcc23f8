//! Rule matching entry points.

use super::result::MatchResult;
use super::statement::Statement;
use crate::features::{Address, FeatureSet};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Matched rules keyed by rule name. Only rules that matched appear.
pub type MatchReport<'a> = BTreeMap<String, Vec<(Address, MatchResult<'a>)>>;

/// A named statement tree describing one detectable capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    /// Grouping path such as `host-interaction/file-system`
    pub namespace: Option<String>,
    pub description: Option<String>,
    pub statement: Statement,
}

impl Rule {
    pub fn new(name: impl Into<String>, statement: Statement) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            description: None,
            statement,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Evaluate one rule against `features` on behalf of `address`.
///
/// Returns `{rule.name: [(address, result)]}` when the rule matches and an
/// empty report otherwise. Every call reports the current truth; callers that
/// poll must de-duplicate on their side.
pub fn match_rule<'a>(rule: &'a Rule, features: &FeatureSet, address: &Address) -> MatchReport<'a> {
    let mut report = MatchReport::new();
    let result = rule.statement.evaluate(features);
    tracing::trace!("rule '{}' evaluated: {}", rule.name, result.is_success());

    if result.is_success() {
        tracing::debug!("rule '{}' matched for {}", rule.name, address);
        report.insert(rule.name.clone(), vec![(address.clone(), result)]);
    }

    report
}

/// Evaluate every rule against the same feature set.
///
/// Rules are spread over rayon workers; each individual evaluation is still
/// sequential. Entries of rules sharing a name are merged in rule order.
pub fn match_rules<'a>(rules: &'a [Rule], features: &FeatureSet, address: &Address) -> MatchReport<'a> {
    let partials: Vec<MatchReport<'a>> = rules
        .par_iter()
        .map(|rule| match_rule(rule, features, address))
        .collect();

    let mut report = MatchReport::new();
    for partial in partials {
        for (name, entries) in partial {
            report.entry(name).or_default().extend(entries);
        }
    }
    report
}
