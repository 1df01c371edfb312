use std::fmt;
use std::io;

use wiresession_serialize::SerializeError;
use wiresession_session::SessionError;
use wiresession_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidMagic
        | TransportError::PartTooLarge { .. }
        | TransportError::TooManyParts { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        TransportError::ConnectionClosed => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn serialize_error(context: &str, err: SerializeError) -> CliError {
    match err {
        SerializeError::Configuration(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Serialize(err) => serialize_error(context, err),
        SessionError::InvalidContent(_) | SessionError::MissingHeader(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        SessionError::RemoteExecution(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_error_class() {
        let err = session_error(
            "recv",
            SessionError::MalformedMessage("2 frames".to_string()),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("recv: "));

        let err = session_error("send", SessionError::InvalidContent("array".to_string()));
        assert_eq!(err.code, USAGE);

        let err = transport_error(
            "read",
            TransportError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "nope")),
        );
        assert_eq!(err.code, PERMISSION_DENIED);

        let err = serialize_error(
            "codec",
            SerializeError::Configuration("missing unpack".to_string()),
        );
        assert_eq!(err.code, USAGE);
    }
}
