//! Kill-stream wire parsing (§6): a stream entry carries either a `payload` JSON object
//! or its keys flattened onto the entry, with `evidence`/`dependencies`/`metadata`
//! possibly embedded as JSON strings on the flattened form.

use crate::models::KillReport;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum WireParseError {
    #[error("entry is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("embedded JSON for field `{0}` is invalid: {1}")]
    EmbeddedJson(&'static str, serde_json::Error),
    #[error("could not deserialize kill report: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("report failed field validation: {0}")]
    Validation(#[from] crate::models::wire::ValidationError),
}

const REQUIRED_FIELDS: &[&str] = &[
    "kill_id",
    "timestamp",
    "target_module",
    "target_instance_id",
    "kill_reason",
    "severity",
    "confidence_score",
    "source_agent",
];

/// Parses a raw stream entry (field name -> raw string value) into a validated
/// [`KillReport`]. Handles both the nested `payload` form and the flattened form where
/// `evidence`/`dependencies`/`metadata` may be JSON-encoded strings.
pub fn parse_kill_report(fields: &HashMap<String, String>) -> Result<KillReport, WireParseError> {
    let object = if let Some(payload) = fields.get("payload") {
        let value: Value = serde_json::from_str(payload)?;
        value
            .as_object()
            .cloned()
            .ok_or(WireParseError::MissingField("payload"))?
    } else {
        flatten_to_object(fields)?
    };

    for field in REQUIRED_FIELDS {
        if !object.contains_key(*field) {
            return Err(WireParseError::MissingField(field));
        }
    }

    let report: KillReport = serde_json::from_value(Value::Object(object))?;
    report.validate()?;
    Ok(report)
}

fn flatten_to_object(fields: &HashMap<String, String>) -> Result<Map<String, Value>, WireParseError> {
    let mut object = Map::new();
    for (key, raw) in fields {
        let value = match key.as_str() {
            "evidence" | "dependencies" | "metadata" => {
                serde_json::from_str(raw).map_err(|e| match key.as_str() {
                    "evidence" => WireParseError::EmbeddedJson("evidence", e),
                    "dependencies" => WireParseError::EmbeddedJson("dependencies", e),
                    _ => WireParseError::EmbeddedJson("metadata", e),
                })?
            }
            "confidence_score" => raw
                .parse::<f64>()
                .map(|n| Value::from(n))
                .unwrap_or(Value::String(raw.clone())),
            _ => Value::String(raw.clone()),
        };
        object.insert(key.clone(), value);
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("kill_id".into(), "kill-1".into());
        fields.insert("timestamp".into(), "2026-07-30T10:00:00Z".into());
        fields.insert("target_module".into(), "payments-api".into());
        fields.insert("target_instance_id".into(), "instance-1".into());
        fields.insert("kill_reason".into(), "ANOMALY_BEHAVIOR".into());
        fields.insert("severity".into(), "LOW".into());
        fields.insert("confidence_score".into(), "0.5".into());
        fields.insert("source_agent".into(), "killer-1".into());
        fields
    }

    #[test]
    fn parses_flattened_entry() {
        let fields = base_fields();
        let report = parse_kill_report(&fields).unwrap();
        assert_eq!(report.kill_id, "kill-1");
        assert_eq!(report.confidence_score, 0.5);
    }

    #[test]
    fn parses_flattened_entry_with_embedded_json_arrays() {
        let mut fields = base_fields();
        fields.insert("evidence".into(), r#"["a","b"]"#.into());
        fields.insert("dependencies".into(), r#"["billing"]"#.into());
        fields.insert("metadata".into(), r#"{"trace":"abc"}"#.into());
        let report = parse_kill_report(&fields).unwrap();
        assert_eq!(report.evidence, vec!["a", "b"]);
        assert_eq!(report.dependencies, vec!["billing"]);
    }

    #[test]
    fn parses_nested_payload_form() {
        let mut fields = HashMap::new();
        let payload = serde_json::json!({
            "kill_id": "kill-2",
            "timestamp": "2026-07-30T10:00:00Z",
            "target_module": "payments-api",
            "target_instance_id": "instance-1",
            "kill_reason": "POLICY_VIOLATION",
            "severity": "HIGH",
            "confidence_score": 0.9,
            "source_agent": "killer-1",
        });
        fields.insert("payload".into(), payload.to_string());
        let report = parse_kill_report(&fields).unwrap();
        assert_eq!(report.kill_id, "kill-2");
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut fields = base_fields();
        fields.remove("severity");
        assert!(matches!(
            parse_kill_report(&fields),
            Err(WireParseError::MissingField("severity"))
        ));
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let mut fields = base_fields();
        fields.insert("severity".into(), "CATASTROPHIC".into());
        assert!(parse_kill_report(&fields).is_err());
    }

    #[test]
    fn rejects_naive_timestamp_without_offset() {
        let mut fields = base_fields();
        fields.insert("timestamp".into(), "2026-07-30T10:00:00".into());
        assert!(parse_kill_report(&fields).is_err());
    }
}
