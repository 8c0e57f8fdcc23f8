//! Observable runtime features and the locations they were seen at.
//!
//! A [`Feature`] names one fact observed in the monitored program (an API call,
//! a string constant). A [`FeatureSet`] maps each feature to the set of
//! [`Address`]es (call sites) where it was observed, and is the input to rule
//! evaluation.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mapping from feature to every location it was observed at.
///
/// A key with an empty location set is treated exactly like a missing key.
pub type FeatureSet = FxHashMap<Feature, FxHashSet<Address>>;

/// Kind tag of a [`Feature`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Api,
    String,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Api => write!(f, "api"),
            FeatureKind::String => write!(f, "string"),
        }
    }
}

/// One observable fact. Identity is kind + value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Feature {
    /// Name of an invoked API
    Api(String),
    /// String constant seen at runtime
    String(String),
}

impl Feature {
    pub fn api(name: impl Into<String>) -> Self {
        Feature::Api(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Feature::String(value.into())
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Api(_) => FeatureKind::Api,
            Feature::String(_) => FeatureKind::String,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Feature::Api(v) | Feature::String(v) => v,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.value())
    }
}

/// Opaque location descriptor (method or call-site signature).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Address(descriptor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::new(s)
    }
}

/// Record `feature` as observed at `address`. Returns true if the pair is new.
pub fn insert_observation(features: &mut FeatureSet, feature: Feature, address: Address) -> bool {
    features.entry(feature).or_default().insert(address)
}

/// Total number of (feature, location) pairs in the set.
pub fn total_locations(features: &FeatureSet) -> usize {
    features.values().map(FxHashSet::len).sum()
}
