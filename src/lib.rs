//! capwatch - runtime capability detection.
//!
//! Rules are boolean expressions over observed runtime features (API calls,
//! strings). Features are collected from an instrumented program, each tagged
//! with the call sites where it was seen, and rules are evaluated against the
//! accumulated set to report which capabilities the program exhibits.
//!
//! # Example
//!
//! ```
//! use capwatch::engine::{match_rule, Rule, Statement};
//! use capwatch::features::{insert_observation, Address, Feature, FeatureSet};
//!
//! let rule = Rule::new(
//!     "delete file after open",
//!     Statement::and(vec![Statement::api("openFile"), Statement::api("deleteFile")]),
//! );
//!
//! let mut features = FeatureSet::default();
//! insert_observation(&mut features, Feature::api("openFile"), Address::from("A.open"));
//! insert_observation(&mut features, Feature::api("deleteFile"), Address::from("A.delete"));
//!
//! let report = match_rule(&rule, &features, &Address::from("application"));
//! assert!(report.contains_key("delete file after open"));
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod features;
pub mod output;
pub mod rules;
pub mod watch;

// Re-export commonly used types at crate root
pub use engine::{match_rule, match_rules, MatchReport, MatchResult, Rule, Statement};
pub use error::{Result, RuleError};
pub use features::{Address, Feature, FeatureKind, FeatureSet};
pub use rules::RuleSet;
