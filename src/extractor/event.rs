//! Decoding of observation lines emitted by the instrumentation script.
//!
//! Lines are free text that may embed one JSON object, e.g.
//! `[Pixel::app]-> {"type":"api","name":"openFile","method":"java.io.File.<init>","args":{"path":"/x"}}`.

use crate::features::{Address, Feature};
use serde::Deserialize;
use serde_json::Value;

/// Method name used when an event carries none
pub const UNKNOWN_METHOD: &str = "unknown";

/// One decoded (feature, location) observation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Observation {
    pub feature: Feature,
    pub address: Address,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    args: Option<Value>,
}

/// Decode the JSON object embedded in `line`, if any.
///
/// Returns None for lines without JSON, malformed JSON, or event types that
/// do not describe a feature.
pub fn decode_line(line: &str) -> Option<Observation> {
    let start = line.find('{')?;
    let end = line.rfind('}')?;
    if end < start {
        return None;
    }

    let event: RawEvent = match serde_json::from_str(&line[start..=end]) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Ignoring undecodable observation: {}", e);
            return None;
        }
    };

    let feature = match event.kind.as_str() {
        "api" => Feature::api(event.name?),
        "string" => Feature::string(event.value.or(event.name)?),
        other => {
            tracing::trace!("Ignoring event type '{}'", other);
            return None;
        }
    };

    let method = event.method.unwrap_or_else(|| UNKNOWN_METHOD.to_string());
    let address = match event.args {
        Some(Value::Object(args)) => {
            let rendered: Vec<String> = args
                .iter()
                .map(|(k, v)| format!("{}={}", k, render_arg(v)))
                .collect();
            Address::new(format!("{}({})", method, rendered.join(",")))
        }
        _ => Address::new(method),
    };

    Some(Observation { feature, address })
}

fn render_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
