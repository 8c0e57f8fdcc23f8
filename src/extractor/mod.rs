//! Feature extraction from a running program.
//!
//! - `event`: decoding of observation lines into (feature, address) pairs
//! - `monitor`: launching and stopping the instrumented process
//!
//! [`FeatureExtractor`] accumulates observations into a
//! [`FeatureSet`](crate::features::FeatureSet). It is an explicit context
//! object owned by the caller; evaluation reads either a borrow of it (when
//! the owner is not ingesting at the same time) or an owned [`snapshot`](FeatureExtractor::snapshot).

mod event;
mod monitor;

pub use event::{decode_line, Observation, UNKNOWN_METHOD};
pub use monitor::{frida_command, Monitor};

use crate::features::{insert_observation, total_locations, Address, Feature, FeatureSet};
use serde::Serialize;

/// Accumulated runtime observations
#[derive(Debug, Default)]
pub struct FeatureExtractor {
    features: FeatureSet,
    observations: u64,
}

/// Summary of what has been observed so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub unique_features: usize,
    pub total_locations: usize,
    /// Decoded observations, including repeats of known pairs
    pub observations: u64,
    /// Most frequently located features, highest count first
    pub top: Vec<(Feature, usize)>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one output line and record it. Returns the observation only
    /// when the (feature, address) pair was not seen before.
    pub fn ingest_line(&mut self, line: &str) -> Option<Observation> {
        let observation = decode_line(line)?;
        if self.record(observation.feature.clone(), observation.address.clone()) {
            Some(observation)
        } else {
            None
        }
    }

    /// Record an observation. Returns true if the pair is new.
    pub fn record(&mut self, feature: Feature, address: Address) -> bool {
        self.observations += 1;
        let is_new = self
            .features
            .get(&feature)
            .map_or(true, |locations| !locations.contains(&address));
        if is_new {
            tracing::info!("Detected {} at {}", feature, address);
            insert_observation(&mut self.features, feature, address);
        }
        is_new
    }

    /// Borrow the accumulated feature set
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Owned copy of the current feature set, safe to evaluate while this
    /// extractor keeps ingesting
    pub fn snapshot(&self) -> FeatureSet {
        self.features.clone()
    }

    pub fn observation_count(&self) -> u64 {
        self.observations
    }

    pub fn statistics(&self, top_n: usize) -> Statistics {
        let mut counts: Vec<(Feature, usize)> = self
            .features
            .iter()
            .map(|(feature, locations)| (feature.clone(), locations.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(top_n);

        Statistics {
            unique_features: self.features.len(),
            total_locations: total_locations(&self.features),
            observations: self.observations,
            top: counts,
        }
    }
}

#[cfg(test)]
mod tests;
