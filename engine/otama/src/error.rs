use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type OtamaResult<T> = Result<T, OtamaError>;

/// Engine failure classes carried by [`OtamaError::Engine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    NoData,
    InvalidArguments,
    AssertionFailure,
    SysError,
    NotImplemented,
    /// A status code the bridge does not know about.
    Unknown(i32),
}

impl EngineErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineErrorKind::NoData => "no-data",
            EngineErrorKind::InvalidArguments => "invalid-arguments",
            EngineErrorKind::AssertionFailure => "assertion-failure",
            EngineErrorKind::SysError => "system-error",
            EngineErrorKind::NotImplemented => "not-implemented",
            EngineErrorKind::Unknown(_) => "unknown",
        }
    }
}

impl Display for EngineErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EngineErrorKind::Unknown(code) => write!(f, "unknown({code})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Error variants surfaced by the bridge.
#[derive(Debug, Error)]
pub enum OtamaError {
    #[error("argument error: {0}")]
    Argument(String),
    #[error("not initialize/config error")]
    NotOpen,
    #[error("not exist file {}", .0.display())]
    IoNotFound(PathBuf),
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{message}")]
    Engine {
        kind: EngineErrorKind,
        message: String,
    },
}

impl OtamaError {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        OtamaError::Argument(message.into())
    }

    /// The engine failure class, if this error came from the engine.
    pub fn engine_kind(&self) -> Option<EngineErrorKind> {
        match self {
            OtamaError::Engine { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
