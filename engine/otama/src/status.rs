use std::fmt::{self, Display, Formatter};

use crate::error::{EngineErrorKind, OtamaError, OtamaResult};

/// Message used for status codes the bridge does not recognize.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown Error";

/// Raw status code returned by every engine call.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(0);
    pub const NODATA: StatusCode = StatusCode(1);
    pub const INVALID_ARGUMENTS: StatusCode = StatusCode(2);
    pub const ASSERTION_FAILURE: StatusCode = StatusCode(3);
    pub const SYSERROR: StatusCode = StatusCode(4);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(5);

    pub fn is_ok(self) -> bool {
        self == StatusCode::OK
    }

    /// Failure class of a defined non-OK code.
    pub fn kind(self) -> Option<EngineErrorKind> {
        match self {
            StatusCode::NODATA => Some(EngineErrorKind::NoData),
            StatusCode::INVALID_ARGUMENTS => Some(EngineErrorKind::InvalidArguments),
            StatusCode::ASSERTION_FAILURE => Some(EngineErrorKind::AssertionFailure),
            StatusCode::SYSERROR => Some(EngineErrorKind::SysError),
            StatusCode::NOT_IMPLEMENTED => Some(EngineErrorKind::NotImplemented),
            _ => None,
        }
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Translate a status code into the bridge error taxonomy.
///
/// Defined codes carry the engine's own message text, fetched lazily through
/// `message`. No retry happens here.
pub fn check(code: StatusCode, message: impl FnOnce(StatusCode) -> String) -> OtamaResult<()> {
    if code.is_ok() {
        return Ok(());
    }
    Err(into_error(code, message))
}

/// Map the outcome of an engine call, treating a failure reported with the
/// OK code as an unknown error.
pub fn map_result<T>(
    result: Result<T, StatusCode>,
    message: impl FnOnce(StatusCode) -> String,
) -> OtamaResult<T> {
    result.map_err(|code| into_error(code, message))
}

fn into_error(code: StatusCode, message: impl FnOnce(StatusCode) -> String) -> OtamaError {
    match code.kind() {
        Some(kind) => OtamaError::Engine {
            kind,
            message: message(code),
        },
        None => OtamaError::Engine {
            kind: EngineErrorKind::Unknown(code.0),
            message: UNKNOWN_ERROR_MESSAGE.to_string(),
        },
    }
}
