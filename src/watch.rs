//! Repeated evaluation of rules while observations accumulate.
//!
//! The engine reports every rule that is currently true on every call. The
//! [`Watcher`] sits on top of it and turns that into a stream of new
//! detections: it skips evaluation when nothing was observed since the last
//! poll and reports each (rule name, address) pair only once.

use crate::config::WatchConfig;
use crate::engine::match_rules;
use crate::extractor::FeatureExtractor;
use crate::features::{Address, Feature, FeatureSet};
use crate::rules::RuleSet;
use crossbeam_channel::{select, Receiver};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::time::Instant;

/// A rule that became true for the first time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub address: Address,
    /// Locations of the observed features that satisfied the rule
    pub locations: Vec<Address>,
}

/// Polling state for one monitored subject
#[derive(Debug)]
pub struct Watcher {
    rules: RuleSet,
    subject: Address,
    reported: FxHashSet<(String, Address)>,
    last_counts: FxHashMap<Feature, usize>,
    evaluations: usize,
}

impl Watcher {
    pub fn new(rules: RuleSet, subject: Address) -> Self {
        Self {
            rules,
            subject,
            reported: FxHashSet::default(),
            last_counts: FxHashMap::default(),
            evaluations: 0,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Number of polls that actually evaluated the rules
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Number of distinct detections reported so far
    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }

    /// Re-evaluate all rules if the feature set grew since the previous poll,
    /// returning only detections not reported before.
    pub fn poll(&mut self, features: &FeatureSet) -> Vec<Detection> {
        let changed = self.has_changed(features);
        self.last_counts = features
            .iter()
            .map(|(feature, locations)| (feature.clone(), locations.len()))
            .collect();

        if !changed {
            return Vec::new();
        }
        self.evaluations += 1;

        let report = match_rules(self.rules.rules(), features, &self.subject);
        let mut detections = Vec::new();
        for (name, entries) in report {
            for (address, result) in entries {
                if !self.reported.insert((name.clone(), address.clone())) {
                    continue;
                }
                detections.push(Detection {
                    namespace: self
                        .rules
                        .owner_of(result.statement)
                        .and_then(|r| r.namespace.clone()),
                    rule: name.clone(),
                    address,
                    locations: result.leaf_locations().into_iter().cloned().collect(),
                });
            }
        }
        detections
    }

    fn has_changed(&self, features: &FeatureSet) -> bool {
        features.iter().any(|(feature, locations)| {
            self.last_counts
                .get(feature)
                .map(|count| locations.len() > *count)
                .unwrap_or(!locations.is_empty())
        })
    }
}

/// Drive a watch session until `lines` disconnects or `stop` fires.
///
/// Observation lines are ingested as they arrive; rules are polled every
/// `config.poll_interval` against a snapshot of the extractor, and once more
/// when the session ends. A disconnected `stop` channel also ends the session;
/// pass [`crossbeam_channel::never`] to run until the observer exits. Returns
/// the number of detections emitted.
pub fn run<F>(
    watcher: &mut Watcher,
    extractor: &mut FeatureExtractor,
    lines: &Receiver<String>,
    stop: &Receiver<()>,
    config: &WatchConfig,
    mut on_detection: F,
) -> usize
where
    F: FnMut(&Detection),
{
    let mut emitted = 0;
    let mut next_poll = Instant::now() + config.poll_interval;

    loop {
        let wait = next_poll.saturating_duration_since(Instant::now());
        let ended = select! {
            recv(lines) -> line => match line {
                Ok(line) => {
                    extractor.ingest_line(&line);
                    false
                }
                Err(_) => {
                    tracing::info!("Observer output ended");
                    true
                }
            },
            recv(stop) -> _ => {
                tracing::info!("Stop requested");
                true
            },
            default(wait) => false,
        };
        if ended {
            break;
        }

        if Instant::now() >= next_poll {
            let stats = extractor.statistics(0);
            tracing::debug!(
                "Features collected: {} unique features, {} locations",
                stats.unique_features,
                stats.total_locations
            );
            for detection in watcher.poll(&extractor.snapshot()) {
                on_detection(&detection);
                emitted += 1;
            }
            next_poll = Instant::now() + config.poll_interval;
        }
    }

    for detection in watcher.poll(&extractor.snapshot()) {
        on_detection(&detection);
        emitted += 1;
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Rule, Statement};
    use crate::features::insert_observation;
    use std::time::Duration;

    fn watcher() -> Watcher {
        let rules = RuleSet::new(vec![
            Rule::new(
                "delete after open",
                Statement::and(vec![Statement::api("openFile"), Statement::api("deleteFile")]),
            )
            .with_namespace("host-interaction/file-system"),
            Rule::new("reads", Statement::api("read")),
        ]);
        Watcher::new(rules, Address::from("application"))
    }

    fn observe(features: &mut FeatureSet, name: &str, addr: &str) {
        insert_observation(features, Feature::api(name), Address::from(addr));
    }

    #[test]
    fn test_poll_reports_new_detections_once() {
        let mut watcher = watcher();
        let mut features = FeatureSet::default();
        observe(&mut features, "openFile", "A.open");

        assert!(watcher.poll(&features).is_empty());

        observe(&mut features, "deleteFile", "A.delete");
        let detections = watcher.poll(&features);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].rule, "delete after open");
        assert_eq!(
            detections[0].namespace.as_deref(),
            Some("host-interaction/file-system")
        );
        assert_eq!(detections[0].address, Address::from("application"));
        assert_eq!(
            detections[0].locations,
            vec![Address::from("A.delete"), Address::from("A.open")]
        );

        // More observations of the same features: evaluated again, nothing new
        observe(&mut features, "openFile", "B.open");
        assert!(watcher.poll(&features).is_empty());
        assert_eq!(watcher.reported_count(), 1);
        assert_eq!(watcher.evaluations(), 3);
    }

    #[test]
    fn test_poll_skips_unchanged_feature_set() {
        let mut watcher = watcher();
        let mut features = FeatureSet::default();

        assert!(watcher.poll(&features).is_empty());
        assert_eq!(watcher.evaluations(), 0);

        observe(&mut features, "read", "R.read");
        assert_eq!(watcher.poll(&features).len(), 1);
        assert!(watcher.poll(&features).is_empty());
        assert_eq!(watcher.evaluations(), 1);
    }

    #[test]
    fn test_detection_namespace_comes_from_matching_rule() {
        let rules = RuleSet::new(vec![
            Rule::new("io", Statement::api("open")).with_namespace("first"),
            Rule::new("io", Statement::api("read")).with_namespace("second"),
        ]);
        let mut watcher = Watcher::new(rules, Address::from("application"));
        let mut features = FeatureSet::default();
        observe(&mut features, "read", "R.read");

        let detections = watcher.poll(&features);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].namespace.as_deref(), Some("second"));
    }

    #[test]
    fn test_run_drains_lines_and_polls_at_end() {
        let mut watcher = watcher();
        let mut extractor = FeatureExtractor::new();
        let config = WatchConfig::new(
            Duration::from_secs(60),
            Duration::from_secs(1),
            "application",
            5,
        )
        .unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(r#"{"type":"api","name":"openFile","method":"A.open"}"#.to_string())
            .unwrap();
        tx.send("noise".to_string()).unwrap();
        tx.send(r#"{"type":"api","name":"deleteFile","method":"A.delete"}"#.to_string())
            .unwrap();
        tx.send(r#"{"type":"api","name":"read","method":"R.read"}"#.to_string())
            .unwrap();
        drop(tx);

        let mut seen = Vec::new();
        let stop = crossbeam_channel::never();
        let emitted = run(&mut watcher, &mut extractor, &rx, &stop, &config, |d| {
            seen.push(d.rule.clone())
        });

        assert_eq!(emitted, 2);
        assert_eq!(seen, vec!["delete after open", "reads"]);
        assert_eq!(extractor.features().len(), 3);
    }

    #[test]
    fn test_run_stops_on_request_and_polls_once_more() {
        let mut watcher = watcher();
        let mut extractor = FeatureExtractor::new();
        let config = WatchConfig::new(
            Duration::from_secs(60),
            Duration::from_secs(1),
            "application",
            5,
        )
        .unwrap();

        // The observer stays connected, as a live instrumentation session does
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(r#"{"type":"api","name":"read","method":"R.read"}"#.to_string())
            .unwrap();

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            stop_tx.send(()).unwrap();
        });

        let started = Instant::now();
        let mut seen = Vec::new();
        let emitted = run(&mut watcher, &mut extractor, &rx, &stop_rx, &config, |d| {
            seen.push(d.rule.clone())
        });
        stopper.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(emitted, 1);
        assert_eq!(seen, vec!["reads"]);
        assert_eq!(extractor.observation_count(), 1);
        drop(tx);
    }
}
