use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building rules, configuring a watch, or driving the monitor.
///
/// Evaluation itself never fails: a missing feature is an ordinary false outcome.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown statement at {path}: {shape}")]
    UnknownStatement { path: String, shape: String },

    #[error("statement `{key}` at {path} expects {expected}")]
    InvalidOperand {
        path: String,
        key: String,
        expected: &'static str,
    },

    #[error("rule in {origin} must declare exactly one root statement, found {count}")]
    RootCount { origin: String, count: usize },

    #[error("rules directory does not exist: {path}")]
    PathNotFound { path: PathBuf },

    #[error("no rule files (*.yml, *.yaml) found in {path}")]
    NoRules { path: PathBuf },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("monitor error: {message}")]
    Monitor { message: String },
}

pub type Result<T> = std::result::Result<T, RuleError>;

impl RuleError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn yaml<S: Into<String>>(origin: S, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            origin: origin.into(),
            source,
        }
    }

    pub fn unknown_statement<P: Into<String>, S: Into<String>>(path: P, shape: S) -> Self {
        Self::UnknownStatement {
            path: path.into(),
            shape: shape.into(),
        }
    }

    pub fn invalid_operand<P: Into<String>, K: Into<String>>(
        path: P,
        key: K,
        expected: &'static str,
    ) -> Self {
        Self::InvalidOperand {
            path: path.into(),
            key: key.into(),
            expected,
        }
    }

    pub fn root_count<S: Into<String>>(origin: S, count: usize) -> Self {
        Self::RootCount {
            origin: origin.into(),
            count,
        }
    }

    pub fn path_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn no_rules<P: Into<PathBuf>>(path: P) -> Self {
        Self::NoRules { path: path.into() }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn monitor<S: Into<String>>(message: S) -> Self {
        Self::Monitor {
            message: message.into(),
        }
    }

    /// Returns true if the error only affects a single rule file, so loading
    /// of the remaining rules can continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Yaml { .. }
                | Self::UnknownStatement { .. }
                | Self::InvalidOperand { .. }
                | Self::RootCount { .. }
        )
    }
}
