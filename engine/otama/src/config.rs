use crate::error::{OtamaError, OtamaResult};
use crate::value::HostValue;

/// How a database handle is opened.
#[derive(Clone, Debug, PartialEq)]
pub enum OpenConfig {
    /// Connection string handed to the engine verbatim.
    ConnectionString(String),
    /// Options mapping, encoded into a variant hash before opening.
    Options(HostValue),
}

impl OpenConfig {
    /// Text opens by connection string, a mapping opens by options.
    pub fn from_host(value: &HostValue) -> OtamaResult<Self> {
        match value {
            HostValue::Text(s) => Ok(OpenConfig::ConnectionString(s.clone())),
            HostValue::Bytes(b) => std::str::from_utf8(b)
                .map(|s| OpenConfig::ConnectionString(s.to_string()))
                .map_err(|_| OtamaError::argument("connection string is not valid utf-8")),
            HostValue::Mapping(_) => Ok(OpenConfig::Options(value.clone())),
            other => Err(OtamaError::argument(format!(
                "not support type: {}",
                other.kind()
            ))),
        }
    }

    /// Parse a JSON object into options, keeping its key order.
    #[cfg(feature = "serde")]
    pub fn from_json_str(input: &str) -> OtamaResult<Self> {
        let json: serde_json::Value =
            serde_json::from_str(input).map_err(|err| OtamaError::Config(err.to_string()))?;
        if !json.is_object() {
            return Err(OtamaError::Config(
                "configuration document must be a JSON object".into(),
            ));
        }
        Ok(OpenConfig::Options(HostValue::from(json)))
    }

    /// Read a JSON configuration file into options.
    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<std::path::Path>) -> OtamaResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => OtamaError::IoNotFound(path.to_path_buf()),
            _ => OtamaError::Config(format!("{}: {err}", path.display())),
        })?;
        Self::from_json_str(&text)
    }
}

impl From<&str> for OpenConfig {
    fn from(value: &str) -> Self {
        OpenConfig::ConnectionString(value.to_string())
    }
}

impl From<String> for OpenConfig {
    fn from(value: String) -> Self {
        OpenConfig::ConnectionString(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_connection_string() {
        let config = OpenConfig::from_host(&HostValue::text("otama.yaml")).unwrap();
        assert_eq!(config, OpenConfig::ConnectionString("otama.yaml".into()));
    }

    #[test]
    fn scalar_config_is_rejected() {
        let err = OpenConfig::from_host(&HostValue::Int(3)).unwrap_err();
        assert!(matches!(err, OtamaError::Argument(_)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_keeps_key_order() {
        let config =
            OpenConfig::from_json_str(r#"{"namespace": "t", "driver": {"name": "color"}}"#)
                .unwrap();
        let OpenConfig::Options(options) = config else {
            panic!("expected options");
        };
        assert_eq!(options.keys(), vec!["namespace".to_string(), "driver".to_string()]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_array_is_not_a_config() {
        assert!(matches!(
            OpenConfig::from_json_str("[1, 2]"),
            Err(OtamaError::Config(_))
        ));
    }
}
