//! Rule loading.
//!
//! Turns YAML rule files into named [`Rule`](crate::engine::Rule)s.
//!
//! # Structure
//! - `models`: serde structures for the rule file layout
//! - `parsing`: raw YAML statement → `Statement` construction
//! - `loader`: directory walking and per-file failure isolation

mod loader;
mod models;
mod parsing;

pub use loader::{load_rule_file, LoadFailure, RuleSet};
pub use parsing::{parse_rule, parse_statement, UNNAMED_RULE};
