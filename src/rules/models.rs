//! Data structures for YAML rule files.
//!
//! ```yaml
//! rule:
//!   meta:
//!     name: delete file after open
//!     namespace: host-interaction/file-system
//!   features:
//!     - and:
//!         - api: openFile
//!         - api: deleteFile
//! ```
//!
//! Statements under `features` stay as raw YAML values here; they are turned
//! into [`Statement`](crate::engine::Statement) trees by `parsing`.

use serde::Deserialize;

/// Top-level document of a rule file
#[derive(Debug, Deserialize)]
pub(crate) struct RuleDocument {
    pub(crate) rule: RawRule,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRule {
    #[serde(default)]
    pub(crate) meta: RawMeta,
    pub(crate) features: Vec<serde_yaml::Value>,
}

/// Rule metadata. Unknown keys (authors, references, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawMeta {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) namespace: Option<String>,
    #[serde(default, alias = "desc")]
    pub(crate) description: Option<String>,
}
