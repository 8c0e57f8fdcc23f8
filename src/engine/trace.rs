//! Evaluation tracing.
//!
//! An [`EvalTrace`] can be handed to [`Statement::evaluate_traced`] to record
//! every node that was actually evaluated. When no trace is passed, evaluation
//! records nothing.

use super::statement::Statement;
use std::sync::RwLock;

/// One evaluated node, in completion order (children before their parent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Node label (`and`, `or`, `not`, or the feature)
    pub label: String,
    pub success: bool,
}

/// Collector of evaluated nodes. Uses RwLock so a shared trace can be read
/// while rules are evaluated from rayon workers.
#[derive(Debug, Default)]
pub struct EvalTrace {
    entries: RwLock<Vec<TraceEntry>>,
}

impl EvalTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, statement: &Statement, success: bool) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(TraceEntry {
                label: statement.label(),
                success,
            });
        }
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// How many times a node with this label was evaluated
    pub fn count(&self, label: &str) -> usize {
        self.entries
            .read()
            .map(|e| e.iter().filter(|entry| entry.label == label).count())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
