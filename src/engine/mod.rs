//! Rule matching engine.
//!
//! Evaluates boolean statement trees over a [`FeatureSet`](crate::features::FeatureSet)
//! and produces structured results explaining the outcome.
//!
//! ## Module Structure
//!
//! - `statement`: the `Statement` AST and its evaluation
//! - `result`: `MatchResult`, the per-node evaluation outcome
//! - `trace`: optional collector of evaluated nodes
//! - `matcher`: `Rule`, `match_rule`, `match_rules`
//!
//! ## Semantics
//!
//! - `and` stops at the first failing child, `or` at the first successful one
//! - `and([])` is true, `or([])` is false
//! - `not` always evaluates its child and inverts only its own outcome
//! - a feature leaf succeeds when the feature has at least one location

mod matcher;
mod result;
mod statement;
mod trace;

pub use matcher::{match_rule, match_rules, MatchReport, Rule};
pub use result::MatchResult;
pub use statement::Statement;
pub use trace::{EvalTrace, TraceEntry};
