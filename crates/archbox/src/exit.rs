use std::fmt;
use std::io;

use archbox_codec::CodecError;
use archbox_outbox::OutboxError;
use archbox_transport::TransportError;

use crate::fields::FieldError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PEER_GONE: i32 = 30;
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

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
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
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } => CliError::usage(format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn field_error(context: &str, err: FieldError) -> CliError {
    match err {
        FieldError::Codec(err) => codec_error(context, err),
        value @ FieldError::Value { .. } => CliError::usage(format!("{context}: {value}")),
    }
}

pub fn outbox_error(context: &str, err: OutboxError) -> CliError {
    match err {
        OutboxError::Transport(err) => transport_error(context, err),
        OutboxError::Spawn(source) => io_error(context, source),
        OutboxError::ConnectionClosed => CliError::new(PEER_GONE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_failures_are_data_errors() {
        let err = codec_error(
            "decode",
            CodecError::TruncatedData {
                needed: 4,
                remaining: 1,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("decode: "));
    }

    #[test]
    fn refused_connect_is_a_transport_error() {
        let err = transport_error(
            "connect",
            TransportError::Connect {
                endpoint: "unix:/tmp/none.sock".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn closed_outbox_maps_to_peer_gone() {
        assert_eq!(outbox_error("send", OutboxError::ConnectionClosed).code, PEER_GONE);
        assert_eq!(
            outbox_error("send", OutboxError::WorkerAlreadyActive).code,
            INTERNAL
        );
    }
}
