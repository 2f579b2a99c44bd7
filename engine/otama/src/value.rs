use std::fmt::{self, Display, Formatter};

use crate::feature::FeatureRaw;

/// Dynamic values exchanged with the host side of the bridge.
///
/// Mappings keep their entries in host iteration order. Duplicate keys are
/// tolerated here; the encoder resolves them with last-write-wins.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Sequence(Vec<HostValue>),
    Mapping(Vec<(HostValue, HostValue)>),
    /// A feature handle produced by [`crate::Database::feature_raw`].
    Feature(FeatureRaw),
    /// A host object the bridge has no conversion for, named by its host type.
    Unrecognized(String),
}

impl HostValue {
    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Text(_) => "text",
            HostValue::Bytes(_) => "bytes",
            HostValue::Sequence(_) => "sequence",
            HostValue::Mapping(_) => "mapping",
            HostValue::Feature(_) => "feature",
            HostValue::Unrecognized(_) => "unrecognized",
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        HostValue::Text(value.into())
    }

    /// Build a mapping with text keys, preserving the given order.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, HostValue)>,
    {
        HostValue::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| (HostValue::Text(key.into()), value))
                .collect(),
        )
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, HostValue::Mapping(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            HostValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Look up a text key in a mapping. The last matching entry wins.
    pub fn get(&self, key: &str) -> Option<&HostValue> {
        match self {
            HostValue::Mapping(entries) => entries
                .iter()
                .rev()
                .find(|(k, _)| matches!(k, HostValue::Text(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Keys of a mapping in iteration order, rendered as text.
    pub fn keys(&self) -> Vec<String> {
        match self {
            HostValue::Mapping(entries) => entries
                .iter()
                .filter_map(|(k, _)| mapping_key_text(k))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Coerce a mapping key to the text used as a hash key on the variant side.
///
/// Only scalar keys have a text form.
pub(crate) fn mapping_key_text(key: &HostValue) -> Option<String> {
    match key {
        HostValue::Text(s) => Some(s.clone()),
        HostValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        HostValue::Int(v) => Some(v.to_string()),
        HostValue::Float(v) => Some(v.to_string()),
        HostValue::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
        HostValue::Null
        | HostValue::Sequence(_)
        | HostValue::Mapping(_)
        | HostValue::Feature(_)
        | HostValue::Unrecognized(_) => None,
    }
}

impl Display for HostValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("None"),
            HostValue::Bool(v) => write!(f, "{v}"),
            HostValue::Int(v) => write!(f, "{v}"),
            HostValue::Float(v) => write!(f, "{v}"),
            HostValue::Text(s) => write!(f, "{s:?}"),
            HostValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            HostValue::Sequence(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
            HostValue::Mapping(entries) => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            HostValue::Feature(feature) => write!(f, "{feature:?}"),
            HostValue::Unrecognized(type_name) => write!(f, "<{type_name}>"),
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(i64::from(value))
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Text(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Text(value)
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(value: Vec<u8>) -> Self {
        HostValue::Bytes(value)
    }
}

impl From<FeatureRaw> for HostValue {
    fn from(value: FeatureRaw) -> Self {
        HostValue::Feature(value)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}
