//! Tests for observation decoding and feature accumulation.

use super::*;
use std::path::Path;
use std::time::Duration;

#[test]
fn test_decode_api_event_with_args() {
    let line = r#"[Pixel::com.example]-> {"type":"api","name":"openFile","method":"java.io.FileInputStream.<init>","args":{"path":"/data/x","mode":1}}"#;
    let obs = decode_line(line).unwrap();
    assert_eq!(obs.feature, Feature::api("openFile"));
    // serde_json objects iterate in key order
    assert_eq!(
        obs.address.as_str(),
        "java.io.FileInputStream.<init>(mode=1,path=/data/x)"
    );
}

#[test]
fn test_decode_api_event_without_method() {
    let obs = decode_line(r#"{"type":"api","name":"deleteFile"}"#).unwrap();
    assert_eq!(obs.feature, Feature::api("deleteFile"));
    assert_eq!(obs.address.as_str(), UNKNOWN_METHOD);
}

#[test]
fn test_decode_empty_args_object() {
    let obs = decode_line(r#"{"type":"api","name":"f","method":"m","args":{}}"#).unwrap();
    assert_eq!(obs.address.as_str(), "m()");
}

#[test]
fn test_decode_non_object_args_ignored() {
    let obs = decode_line(r#"{"type":"api","name":"f","method":"m","args":[1,2]}"#).unwrap();
    assert_eq!(obs.address.as_str(), "m");
}

#[test]
fn test_decode_string_event() {
    let obs = decode_line(r#"{"type":"string","value":"/etc/hosts","method":"Resolver.load"}"#)
        .unwrap();
    assert_eq!(obs.feature, Feature::string("/etc/hosts"));
    assert_eq!(obs.address.as_str(), "Resolver.load");
}

#[test]
fn test_decode_ignores_noise() {
    assert!(decode_line("Spawned `com.example`. Resuming main thread!").is_none());
    assert!(decode_line("{not json}").is_none());
    assert!(decode_line("} backwards {").is_none());
    assert!(decode_line(r#"{"type":"log","message":"hello"}"#).is_none());
    assert!(decode_line(r#"{"type":"api"}"#).is_none());
    assert!(decode_line(r#"{"name":"openFile"}"#).is_none());
}

#[test]
fn test_ingest_reports_only_new_pairs() {
    let mut extractor = FeatureExtractor::new();
    let line = r#"{"type":"api","name":"openFile","method":"A.open"}"#;

    assert!(extractor.ingest_line(line).is_some());
    assert!(extractor.ingest_line(line).is_none());
    assert!(extractor
        .ingest_line(r#"{"type":"api","name":"openFile","method":"B.open"}"#)
        .is_some());
    assert!(extractor.ingest_line("garbage").is_none());

    assert_eq!(extractor.observation_count(), 3);
    assert_eq!(extractor.features().len(), 1);
    assert_eq!(extractor.features()[&Feature::api("openFile")].len(), 2);
}

#[test]
fn test_snapshot_is_independent() {
    let mut extractor = FeatureExtractor::new();
    extractor.record(Feature::api("a"), Address::from("1"));
    let snapshot = extractor.snapshot();

    extractor.record(Feature::api("b"), Address::from("2"));
    assert_eq!(snapshot.len(), 1);
    assert_eq!(extractor.features().len(), 2);
}

#[test]
fn test_statistics_top_features() {
    let mut extractor = FeatureExtractor::new();
    for addr in ["1", "2", "3"] {
        extractor.record(Feature::api("read"), Address::from(addr));
    }
    for addr in ["1", "2"] {
        extractor.record(Feature::api("write"), Address::from(addr));
        extractor.record(Feature::api("close"), Address::from(addr));
    }
    extractor.record(Feature::api("open"), Address::from("1"));
    extractor.record(Feature::api("open"), Address::from("1"));

    let stats = extractor.statistics(3);
    assert_eq!(stats.unique_features, 4);
    assert_eq!(stats.total_locations, 8);
    assert_eq!(stats.observations, 9);
    assert_eq!(
        stats.top,
        vec![
            (Feature::api("read"), 3),
            (Feature::api("close"), 2),
            (Feature::api("write"), 2),
        ]
    );
}

#[test]
fn test_record_repeat_is_counted_but_not_new() {
    let mut extractor = FeatureExtractor::new();
    assert!(extractor.record(Feature::api("open"), Address::from("A.open")));
    assert!(!extractor.record(Feature::api("open"), Address::from("A.open")));
    assert!(extractor.record(Feature::api("open"), Address::from("B.open")));

    assert_eq!(extractor.observation_count(), 3);
    assert_eq!(extractor.features()[&Feature::api("open")].len(), 2);
}

#[test]
fn test_statistics_empty() {
    let stats = FeatureExtractor::new().statistics(5);
    assert_eq!(stats.unique_features, 0);
    assert_eq!(stats.total_locations, 0);
    assert!(stats.top.is_empty());
}

#[test]
fn test_frida_command_requires_script() {
    let err = frida_command("com.example", Path::new("/nonexistent/hook.js")).unwrap_err();
    assert!(err.to_string().contains("does not exist"));

    let dir = tempfile::TempDir::new().unwrap();
    let script = dir.path().join("hook.js");
    std::fs::write(&script, "// hooks").unwrap();
    let (program, args) = frida_command("com.example", &script).unwrap();
    assert_eq!(program, "frida");
    assert_eq!(args[0], "-U");
    assert_eq!(args[1], "-l");
    assert_eq!(args[3], "-f");
    assert_eq!(args[4], "com.example");
}

#[cfg(unix)]
#[test]
fn test_monitor_forwards_stdout_lines() {
    let script = r#"echo '{"type":"api","name":"openFile","method":"m"}'; echo noise; echo oops >&2"#;
    let monitor = Monitor::spawn("sh", &["-c".to_string(), script.to_string()]).unwrap();

    let mut lines = Vec::new();
    while let Ok(line) = monitor.lines().recv_timeout(Duration::from_secs(5)) {
        lines.push(line);
    }
    assert_eq!(lines.len(), 2);
    assert!(decode_line(&lines[0]).is_some());
    monitor.stop(Duration::from_secs(1)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_monitor_stop_terminates_long_running_process() {
    let monitor = Monitor::spawn("sleep", &["30".to_string()]).unwrap();
    monitor.stop(Duration::from_secs(2)).unwrap();
}

/// True once `pid` has exited (gone, or a zombie awaiting its new parent)
#[cfg(target_os = "linux")]
fn process_gone(pid: &str) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat.contains(") Z "),
        Err(_) => true,
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_monitor_stop_reaches_observer_children() {
    // The observer backgrounds a helper and reports its pid
    let script = "sleep 30 & echo $!; wait";
    let monitor = Monitor::spawn("sh", &["-c".to_string(), script.to_string()]).unwrap();
    let helper = monitor
        .lines()
        .recv_timeout(Duration::from_secs(5))
        .unwrap()
        .trim()
        .to_string();
    assert!(!process_gone(&helper));

    monitor.stop(Duration::from_secs(2)).unwrap();

    let mut gone = false;
    for _ in 0..60 {
        if process_gone(&helper) {
            gone = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(gone, "helper process {} survived stop()", helper);
}

#[test]
fn test_monitor_spawn_failure() {
    let err = Monitor::spawn("/nonexistent/capwatch-observer", &[]).unwrap_err();
    assert!(matches!(err, crate::error::RuleError::Monitor { .. }));
}
