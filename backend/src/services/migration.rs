//! Upgrades persisted metric documents to the current schema.
//!
//! Documents written before versioning was introduced (no `version`, or a
//! version below 1) stored `channels_info` as an object keyed by channel id;
//! the current schema stores it as an array. Migration works on the loosely
//! typed JSON value so that it runs before the strict decoding step.

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::errors::{MetricError, MetricResult};

/// Schema version written by this reporter.
pub const CURRENT_VERSION: u64 = 2;

const VERSION_FIELD: &str = "version";
const CHANNELS_INFO_FIELD: &str = "channels_info";

/// Migrates `document` in place. Running it on a current document only
/// re-asserts the version.
pub fn migrate(document: &mut Map<String, Value>) -> MetricResult<()> {
    let version = document.get(VERSION_FIELD).and_then(Value::as_f64);
    if version.map_or(true, |version| version < 1.0) {
        info!("migrating channels_info from version 0 to version 1");
        let Some(channels_info) = document.get_mut(CHANNELS_INFO_FIELD) else {
            error!("channels_info is missing from the legacy payload");
            return Err(MetricError::Migration(
                "channels_info is not in the payload for migration".to_string(),
            ));
        };
        // TODO: validate non-object shapes once historical payloads are available.
        if let Value::Object(keyed) = channels_info {
            let records: Vec<Value> = std::mem::take(keyed).into_iter().map(|(_, v)| v).collect();
            *channels_info = Value::Array(records);
            document.insert(VERSION_FIELD.to_string(), Value::from(1u64));
        }
    }
    document.insert(VERSION_FIELD.to_string(), Value::from(CURRENT_VERSION));
    Ok(())
}

/// Migrates an arbitrary decoded value, which must be a JSON object.
pub fn migrate_value(document: &mut Value) -> MetricResult<()> {
    match document {
        Value::Object(map) => migrate(map),
        other => Err(MetricError::Migration(format!(
            "expected a JSON object, found {}",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn legacy_keyed_channels_become_an_array() {
        let mut doc = object(json!({
            "metric_name": "metric_one",
            "channels_info": {
                "1x1x0": {"channel_id": "1x1x0"},
                "2x2x0": {"channel_id": "2x2x0"}
            }
        }));
        migrate(&mut doc).unwrap();

        assert_eq!(doc["version"], json!(2));
        let channels = doc["channels_info"].as_array().unwrap();
        let mut ids: Vec<&str> = channels
            .iter()
            .map(|c| c["channel_id"].as_str().unwrap())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["1x1x0", "2x2x0"]);
    }

    #[test]
    fn version_zero_is_legacy() {
        let mut doc = object(json!({"version": 0, "channels_info": {}}));
        migrate(&mut doc).unwrap();
        assert_eq!(doc["channels_info"], json!([]));
        assert_eq!(doc["version"], json!(2));
    }

    #[test]
    fn legacy_without_channels_info_is_rejected() {
        let mut doc = object(json!({"metric_name": "metric_one"}));
        let err = migrate(&mut doc).unwrap_err();
        assert!(matches!(err, MetricError::Migration(_)));
    }

    #[test]
    fn legacy_array_is_accepted_as_is() {
        let mut doc = object(json!({"channels_info": [{"channel_id": "1x1x0"}]}));
        migrate(&mut doc).unwrap();
        assert_eq!(doc["channels_info"], json!([{"channel_id": "1x1x0"}]));
        assert_eq!(doc["version"], json!(2));
    }

    #[test]
    fn migration_is_idempotent() {
        let original = object(json!({
            "version": 1,
            "metric_name": "metric_one",
            "channels_info": [{"channel_id": "1x1x0"}],
            "history": []
        }));
        let mut once = original.clone();
        migrate(&mut once).unwrap();
        let mut twice = once.clone();
        migrate(&mut twice).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice["version"], json!(CURRENT_VERSION));
        assert_eq!(twice["channels_info"], original["channels_info"]);
    }

    #[test]
    fn non_object_documents_are_rejected() {
        let mut doc = json!([1, 2, 3]);
        let err = migrate_value(&mut doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "migration failed: expected a JSON object, found an array"
        );
    }
}
