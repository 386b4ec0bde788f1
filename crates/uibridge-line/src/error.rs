use std::time::Duration;

use crate::codec::ScalarKind;

/// Errors raised while encoding, decoding, reading or writing lines.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// A line could not be decoded as the expected scalar kind.
    #[error("malformed {kind} field: {line:?}")]
    Malformed { kind: ScalarKind, line: String },

    /// No complete line arrived within the bounded wait.
    #[error("timed out after {waited:?} waiting for {kind} field")]
    Timeout { kind: ScalarKind, waited: Duration },

    /// A line grew past the configured maximum without a terminator.
    #[error("line too long ({len} bytes, max {max})")]
    LineTooLong { len: usize, max: usize },

    /// A line was not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// A command with no fields was submitted for sending.
    #[error("refusing to send an empty message")]
    EmptyMessage,

    /// The peer closed the channel.
    #[error("channel closed by peer")]
    ChannelClosed,

    /// An I/O error occurred on the channel.
    #[error("line I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LineError {
    /// Whether the error means the channel itself is unusable.
    ///
    /// Everything else is a problem with one line and is absorbed by the
    /// reader's default-value policy.
    pub fn is_channel_fault(&self) -> bool {
        matches!(self, Self::ChannelClosed | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, LineError>;
