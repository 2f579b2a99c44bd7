use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Number, Value as JsonValue};

use crate::results::Record;
use crate::value::{mapping_key_text, HostValue};

impl From<JsonValue> for HostValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => HostValue::Null,
            JsonValue::Bool(v) => HostValue::Bool(v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(v) => HostValue::Int(v),
                None => n.as_f64().map_or(HostValue::Null, HostValue::Float),
            },
            JsonValue::String(s) => HostValue::Text(s),
            JsonValue::Array(items) => {
                HostValue::Sequence(items.into_iter().map(HostValue::from).collect())
            }
            JsonValue::Object(entries) => HostValue::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (HostValue::Text(k), HostValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&HostValue> for JsonValue {
    fn from(value: &HostValue) -> Self {
        match value {
            HostValue::Null | HostValue::Feature(_) | HostValue::Unrecognized(_) => {
                JsonValue::Null
            }
            HostValue::Bool(v) => JsonValue::Bool(*v),
            HostValue::Int(v) => JsonValue::Number(Number::from(*v)),
            HostValue::Float(v) => Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
            HostValue::Text(s) => JsonValue::String(s.clone()),
            HostValue::Bytes(b) => JsonValue::String(hex::encode(b)),
            HostValue::Sequence(items) => {
                JsonValue::Array(items.iter().map(JsonValue::from).collect())
            }
            HostValue::Mapping(entries) => {
                let mut map = Map::new();
                for (key, item) in entries {
                    if let Some(key) = mapping_key_text(key) {
                        map.insert(key, JsonValue::from(item));
                    }
                }
                JsonValue::Object(map)
            }
        }
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HostValue::Null | HostValue::Feature(_) | HostValue::Unrecognized(_) => {
                serializer.serialize_unit()
            }
            HostValue::Bool(v) => serializer.serialize_bool(*v),
            HostValue::Int(v) => serializer.serialize_i64(*v),
            HostValue::Float(v) => serializer.serialize_f64(*v),
            HostValue::Text(s) => serializer.serialize_str(s),
            HostValue::Bytes(b) => serializer.serialize_bytes(b),
            HostValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            HostValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, item) in entries {
                    if let Some(key) = mapping_key_text(key) {
                        map.serialize_entry(&key, item)?;
                    }
                }
                map.end()
            }
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.fields() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
