use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema-less JSON value used for tool parameter schemas and other free-form payloads.
///
/// Variant order matters for decoding: serde tries untagged variants top to
/// bottom, so `null` and booleans are matched before strings and numbers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum JsonValue {
    Null,
    Bool(bool),
    String(String),
    Number(f64),
    Array(Vec<JsonValue>),
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// Looks up a key when this value is an object.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        JsonValue::String(value.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(value)
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        JsonValue::Number(value)
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        JsonValue::Bool(value)
    }
}

impl<T: Into<JsonValue>> From<Vec<T>> for JsonValue {
    fn from(values: Vec<T>) -> Self {
        JsonValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, JsonValue>> for JsonValue {
    fn from(map: BTreeMap<String, JsonValue>) -> Self {
        JsonValue::Object(map)
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
            serde_json::Value::Object(map) => JsonValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(b),
            // non-finite numbers have no JSON form
            JsonValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            JsonValue::String(s) => serde_json::Value::String(s),
            JsonValue::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            JsonValue::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_booleans_are_not_numbers_or_strings() {
        let value: JsonValue = serde_json::from_str("true").unwrap();
        assert_eq!(value, JsonValue::Bool(true));

        let value: JsonValue = serde_json::from_str(r#"[false, "false", 0]"#).unwrap();
        assert_eq!(
            value,
            JsonValue::Array(vec![
                JsonValue::Bool(false),
                JsonValue::String("false".to_string()),
                JsonValue::Number(0.0),
            ])
        );
    }

    #[test]
    fn test_null_and_nested_objects_decode() {
        let value: JsonValue = serde_json::from_str(
            r#"{"type": "object", "required": ["city"], "properties": {"city": {"type": "string"}}, "extra": null}"#,
        )
        .unwrap();

        assert_eq!(value.get("type").and_then(JsonValue::as_str), Some("object"));
        assert!(value.get("extra").map(JsonValue::is_null).unwrap_or(false));
        assert_eq!(
            value
                .get("properties")
                .and_then(|p| p.get("city"))
                .and_then(|c| c.get("type"))
                .and_then(JsonValue::as_str),
            Some("string")
        );
    }

    #[test]
    fn test_encodes_as_plain_json() {
        let mut map = BTreeMap::new();
        map.insert("enabled".to_string(), JsonValue::Bool(true));
        map.insert("limit".to_string(), JsonValue::Number(2.5));
        map.insert("tags".to_string(), JsonValue::from(vec!["a", "b"]));
        map.insert("none".to_string(), JsonValue::Null);

        let encoded = serde_json::to_value(JsonValue::Object(map)).unwrap();
        assert_eq!(
            encoded,
            json!({"enabled": true, "limit": 2.5, "tags": ["a", "b"], "none": null})
        );
    }

    #[test]
    fn test_serde_json_value_conversion() {
        let original = json!({"a": [1, true, null, "x"], "b": {"c": 1.5}});
        let converted = JsonValue::from(original.clone());
        assert_eq!(
            converted.get("b").and_then(|b| b.get("c")).and_then(JsonValue::as_f64),
            Some(1.5)
        );
        let back: serde_json::Value = converted.into();
        assert_eq!(back["a"][1], json!(true));
        assert_eq!(back["a"][2], json!(null));
        assert_eq!(back["a"][0].as_f64(), Some(1.0));
    }
}
