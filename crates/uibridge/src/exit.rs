use std::fmt;
use std::io;

use uibridge_line::LineError;
use uibridge_session::SessionError;
use uibridge_stream::StreamError;
use uibridge_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
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
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { ref source, .. } | TransportError::Connect { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::InvalidDescriptor { .. } | TransportError::PathTooLong { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn line_error(context: &str, err: LineError) -> CliError {
    match err {
        LineError::Io(source) => io_error(context, source),
        LineError::ChannelClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        LineError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        LineError::Malformed { .. }
        | LineError::LineTooLong { .. }
        | LineError::InvalidUtf8
        | LineError::EmptyMessage => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Line(err) => line_error(context, err),
        SessionError::UnknownKeyword(_)
        | SessionError::ArgumentCount { .. }
        | SessionError::ArgumentType { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        SessionError::ReadyTimeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        SessionError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn stream_error(context: &str, err: StreamError) -> CliError {
    match err {
        StreamError::InvalidUrl { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        StreamError::Connect { .. } | StreamError::Http(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        StreamError::HttpStatus { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        StreamError::Io(source) => io_error(context, source),
    }
}
