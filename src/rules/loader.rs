//! Loading rule files from disk.

use super::parsing::parse_rule;
use crate::engine::{Rule, Statement};
use crate::error::{Result, RuleError};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A rule file that could not be turned into a rule
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: RuleError,
}

/// Every rule loaded from a directory, plus the files that failed to load.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    failures: Vec<LoadFailure>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            failures: Vec::new(),
        }
    }

    /// Load every `*.yml` / `*.yaml` file below `dir`, recursively.
    ///
    /// Files load independently: a malformed rule is recorded as a
    /// [`LoadFailure`] and does not stop the others. Fails only when the
    /// directory is missing or holds no rule files at all.
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let _span = tracing::info_span!("load_rules").entered();
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(RuleError::path_not_found(dir));
        }

        tracing::info!("Loading rules from {}", dir.display());
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && is_rule_file(entry.path()))
            .map(|entry| entry.path().to_path_buf())
            .collect();

        // Deterministic order regardless of filesystem iteration order
        files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));

        if files.is_empty() {
            return Err(RuleError::no_rules(dir));
        }
        tracing::debug!("Found {} rule files", files.len());

        let loaded: Vec<(PathBuf, Result<Rule>)> = files
            .into_par_iter()
            .map(|path| {
                tracing::trace!("Parsing {}", path.display());
                let result = load_rule_file(&path);
                (path, result)
            })
            .collect();

        let mut set = RuleSet::default();
        for (path, result) in loaded {
            match result {
                Ok(rule) => set.rules.push(rule),
                Err(error) => {
                    tracing::warn!("Skipping rule {}: {}", path.display(), error);
                    set.failures.push(LoadFailure { path, error });
                }
            }
        }

        {
            let mut seen = FxHashSet::default();
            for rule in &set.rules {
                if !seen.insert(rule.name.as_str()) {
                    tracing::warn!("Duplicate rule name '{}'", rule.name);
                }
            }
        }

        tracing::info!(
            "Loaded {} rules ({} failed)",
            set.rules.len(),
            set.failures.len()
        );
        Ok(set)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule with the given name
    pub fn find(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// The rule owning `statement`, compared by identity rather than by name,
    /// so rules sharing a name stay distinguishable in a merged report
    pub fn owner_of(&self, statement: &Statement) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| std::ptr::eq(&r.statement, statement))
    }
}

/// Read and parse a single rule file
pub fn load_rule_file<P: AsRef<Path>>(path: P) -> Result<Rule> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| RuleError::io(path, e))?;
    parse_rule(&content, &path.display().to_string())
}

fn is_rule_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
        .unwrap_or(false)
}
