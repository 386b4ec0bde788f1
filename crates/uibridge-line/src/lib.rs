//! Line framing for the UI bridge protocol.
//!
//! Every value travels as one text line:
//! - strings verbatim, with embedded `\n` written as `\r`
//! - booleans as `true` / `false`
//! - integers in decimal
//! - floats with exactly ten fractional digits
//! - null as `(null)`
//!
//! A message is a keyword line followed by the keyword's fixed argument
//! lines. [`MessageSender`] writes whole messages atomically;
//! [`LineReader`] reads them back one line at a time, waiting a bounded
//! amount of time for lines the peer has not written yet.

pub mod codec;
pub mod config;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_scalar, encode_line, encode_scalar, Scalar, ScalarKind, NULL_LITERAL};
pub use config::{LineConfig, RetryPolicy, DEFAULT_MAX_LINE_LEN};
pub use error::{LineError, Result};
pub use reader::LineReader;
pub use writer::{MessageSender, SendGuard};
