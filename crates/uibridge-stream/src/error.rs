/// Errors raised while opening or reading an event stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The stream URL cannot be used.
    #[error("invalid stream url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The stream host did not accept a connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("stream request failed with HTTP {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    /// The HTTP exchange failed after connecting.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error occurred on the stream.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding one event or peaks line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    #[error("missing {field} field")]
    MissingField { field: &'static str },

    #[error("{field} is not an integer: {value:?}")]
    InvalidInt { field: &'static str, value: String },

    #[error("{field} is not a number: {value:?}")]
    InvalidFloat { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, StreamError>;
