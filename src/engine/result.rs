//! Structured outcome of evaluating a statement tree.

use super::statement::Statement;
use crate::features::Address;
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};

/// Result of evaluating one [`Statement`] node.
///
/// `children` holds exactly the child results that were evaluated, so for
/// `and`/`or` it may be a prefix of the declared children. `locations` is
/// only present on leaves; composite nodes never merge child locations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult<'a> {
    pub success: bool,
    #[serde(serialize_with = "serialize_statement")]
    pub statement: &'a Statement,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MatchResult<'a>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_locations"
    )]
    pub locations: Option<FxHashSet<Address>>,
}

impl<'a> MatchResult<'a> {
    pub(crate) fn leaf(statement: &'a Statement, locations: FxHashSet<Address>) -> Self {
        Self {
            success: !locations.is_empty(),
            statement,
            children: Vec::new(),
            locations: Some(locations),
        }
    }

    pub(crate) fn composite(
        success: bool,
        statement: &'a Statement,
        children: Vec<MatchResult<'a>>,
    ) -> Self {
        Self {
            success,
            statement,
            children,
            locations: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Locations of every successful leaf in the evaluated subtree, sorted.
    ///
    /// Leaves below a `not` are skipped: their presence is what made the
    /// negation fail, so they never explain a success.
    pub fn leaf_locations(&self) -> Vec<&Address> {
        let mut out = Vec::new();
        self.collect_locations(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_locations<'r>(&'r self, out: &mut Vec<&'r Address>) {
        if let Some(ref locations) = self.locations {
            if self.success {
                out.extend(locations.iter());
            }
            return;
        }
        if matches!(self.statement, Statement::Not(_)) {
            return;
        }
        for child in &self.children {
            child.collect_locations(out);
        }
    }

    /// Render the evaluated subtree as an indented explanation, one node per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(0, &mut out);
        out
    }

    fn explain_into(&self, depth: usize, out: &mut String) {
        let mark = if self.success { "+" } else { "-" };
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{} {}", mark, self.statement.label()));
        if let Some(ref locations) = self.locations {
            if !locations.is_empty() {
                let mut sorted: Vec<&str> = locations.iter().map(Address::as_str).collect();
                sorted.sort_unstable();
                out.push_str(&format!(" @ {}", sorted.join(", ")));
            }
        }
        out.push('\n');
        for child in &self.children {
            child.explain_into(depth + 1, out);
        }
    }
}

fn serialize_statement<S: Serializer>(statement: &&Statement, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&statement.label())
}

fn serialize_locations<S: Serializer>(
    locations: &Option<FxHashSet<Address>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    let mut sorted: Vec<&Address> = locations.iter().flatten().collect();
    sorted.sort();
    sorted.serialize(s)
}
