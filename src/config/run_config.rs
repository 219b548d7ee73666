use serde_json::{Map, Value};

/// Parse run-config YAML into a JSON document.
///
/// Empty or null text yields `{}`. Malformed text also yields `{}`: a partition
/// whose config cannot be read still launches with the job's defaults.
pub fn parse_run_config(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Object(Map::new());
    }

    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Null) => Value::Object(Map::new()),
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse run config, using an empty document");
            Value::Object(Map::new())
        }
    }
}
