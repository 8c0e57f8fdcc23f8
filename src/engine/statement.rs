//! Statement AST and its evaluation over a feature set.

use super::result::MatchResult;
use super::trace::EvalTrace;
use crate::features::{Feature, FeatureSet};
use std::fmt;

/// One node of a boolean rule expression.
///
/// Trees are immutable once built and hold no evaluation state, so the same
/// tree can be evaluated any number of times against different feature sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// All children must succeed. Stops at the first failure.
    And(Vec<Statement>),
    /// Any child must succeed. Stops at the first success.
    Or(Vec<Statement>),
    /// Inverts its single child.
    Not(Box<Statement>),
    /// Leaf: the feature was observed at one or more locations.
    Feature(Feature),
}

impl Statement {
    pub fn and(children: Vec<Statement>) -> Self {
        Statement::And(children)
    }

    pub fn or(children: Vec<Statement>) -> Self {
        Statement::Or(children)
    }

    pub fn not(child: Statement) -> Self {
        Statement::Not(Box::new(child))
    }

    pub fn feature(feature: Feature) -> Self {
        Statement::Feature(feature)
    }

    pub fn api(name: impl Into<String>) -> Self {
        Statement::Feature(Feature::api(name))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Statement::Feature(Feature::string(value))
    }

    /// Short node label used in explanations: `and`, `or`, `not`, or the feature.
    pub fn label(&self) -> String {
        match self {
            Statement::And(_) => "and".to_string(),
            Statement::Or(_) => "or".to_string(),
            Statement::Not(_) => "not".to_string(),
            Statement::Feature(feature) => feature.to_string(),
        }
    }

    /// Evaluate this statement against `features`.
    pub fn evaluate<'a>(&'a self, features: &FeatureSet) -> MatchResult<'a> {
        self.evaluate_traced(features, None)
    }

    /// Evaluate, recording every visited node into `trace` when present.
    pub fn evaluate_traced<'a>(
        &'a self,
        features: &FeatureSet,
        trace: Option<&EvalTrace>,
    ) -> MatchResult<'a> {
        let result = match self {
            Statement::Feature(feature) => {
                let locations = features.get(feature).cloned().unwrap_or_default();
                MatchResult::leaf(self, locations)
            }
            Statement::And(children) => {
                let mut evaluated = Vec::with_capacity(children.len());
                let mut success = true;
                for child in children {
                    let result = child.evaluate_traced(features, trace);
                    let matched = result.success;
                    evaluated.push(result);
                    if !matched {
                        success = false;
                        break;
                    }
                }
                MatchResult::composite(success, self, evaluated)
            }
            Statement::Or(children) => {
                let mut evaluated = Vec::with_capacity(children.len());
                let mut success = false;
                for child in children {
                    let result = child.evaluate_traced(features, trace);
                    let matched = result.success;
                    evaluated.push(result);
                    if matched {
                        success = true;
                        break;
                    }
                }
                MatchResult::composite(success, self, evaluated)
            }
            Statement::Not(child) => {
                let result = child.evaluate_traced(features, trace);
                MatchResult::composite(!result.success, self, vec![result])
            }
        };

        if let Some(trace) = trace {
            trace.record(self, result.success);
        }

        result
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::And(children) | Statement::Or(children) => {
                write!(f, "{}(", self.label())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
            Statement::Not(child) => write!(f, "not({})", child),
            Statement::Feature(feature) => write!(f, "{}", feature),
        }
    }
}
