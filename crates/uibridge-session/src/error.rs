use std::time::Duration;

use uibridge_line::ScalarKind;

/// Errors raised by the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] uibridge_transport::TransportError),

    /// Line-level error.
    #[error("line error: {0}")]
    Line(#[from] uibridge_line::LineError),

    /// A keyword outside the protocol vocabulary.
    #[error("unknown keyword {0:?}")]
    UnknownKeyword(String),

    /// A command was built with the wrong number of arguments.
    #[error("{keyword} takes {expected} argument(s), got {got}")]
    ArgumentCount {
        keyword: &'static str,
        expected: usize,
        got: usize,
    },

    /// A command argument had the wrong type.
    #[error("{keyword} argument {index} must be {expected}")]
    ArgumentType {
        keyword: &'static str,
        index: usize,
        expected: ScalarKind,
    },

    /// The UI did not announce itself in time.
    #[error("no ready announcement within {0:?}")]
    ReadyTimeout(Duration),

    /// The session has been closed.
    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Whether the peer is gone and the session cannot continue.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Line(err) => err.is_channel_fault(),
            Self::Closed => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
