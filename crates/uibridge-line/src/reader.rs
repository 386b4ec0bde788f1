use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{trace, warn};
use uibridge_transport::WaitReadable;

use crate::codec::{decode_scalar, Scalar, ScalarKind};
use crate::config::LineConfig;
use crate::error::{LineError, Result};

/// Reads newline-terminated lines from a channel without ever blocking
/// indefinitely.
///
/// [`try_read_line`](Self::try_read_line) never waits. The field readers
/// wait at most one retry window (one second by default) and fall back to
/// the kind's default value when the peer stays silent.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    scratch: Vec<u8>,
    config: LineConfig,
    closed: bool,
}

impl<T: Read + WaitReadable> LineReader<T> {
    /// Create a line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a line reader with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.read_chunk_size),
            scratch: vec![0u8; config.read_chunk_size.max(1)],
            config,
            closed: false,
        }
    }

    /// Return the next complete line if one is available right now.
    ///
    /// `Ok(None)` means nothing complete has arrived yet. EOF is reported as
    /// [`LineError::ChannelClosed`], here and on every later call.
    pub fn try_read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.take_buffered_line()? {
                return Ok(Some(line));
            }
            if self.closed {
                return Err(LineError::ChannelClosed);
            }
            if !self.inner.wait_readable(Duration::ZERO)? {
                return Ok(None);
            }

            let read = match self.inner.read(&mut self.scratch) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(LineError::Io(err)),
            };

            if read == 0 {
                if !self.buf.is_empty() {
                    warn!(
                        pending = self.buf.len(),
                        "channel closed with an unterminated line; dropping it"
                    );
                    self.buf.clear();
                }
                self.closed = true;
                return Err(LineError::ChannelClosed);
            }
            self.buf.extend_from_slice(&self.scratch[..read]);
        }
    }

    /// Wait up to `window` for a complete line.
    ///
    /// Returns `Ok(None)` when the window expires.
    pub fn read_line_within(&mut self, window: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + window;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if let Some(line) = self.try_read_line()? {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                trace!(attempts, "line wait expired");
                return Ok(None);
            }
            let slice = self.config.retry.interval.min(deadline - now);
            self.inner.wait_readable(slice)?;
        }
    }

    /// Wait one retry window for a complete line.
    pub fn read_line_blocking(&mut self) -> Result<Option<String>> {
        self.read_line_within(self.config.retry.window())
    }

    /// Read one field of `kind`, reporting timeouts and bad lines as errors.
    pub fn read_field_strict(&mut self, kind: ScalarKind) -> Result<Scalar> {
        let started = Instant::now();
        match self.read_line_blocking()? {
            Some(line) => decode_scalar(&line, kind),
            None => Err(LineError::Timeout {
                kind,
                waited: started.elapsed(),
            }),
        }
    }

    /// Read one field of `kind`, substituting the kind's default on timeout
    /// or malformed input.
    ///
    /// Only channel faults are returned as errors.
    pub fn read_field(&mut self, kind: ScalarKind) -> Result<Scalar> {
        match self.read_field_strict(kind) {
            Ok(value) => Ok(value),
            Err(err) if err.is_channel_fault() => Err(err),
            Err(LineError::Timeout { waited, .. }) => {
                warn!(
                    %kind,
                    waited_ms = waited.as_millis() as u64,
                    "timed out waiting for field; using default"
                );
                Ok(kind.default_value())
            }
            Err(err) => {
                warn!(%kind, error = %err, "unreadable field; using default");
                Ok(kind.default_value())
            }
        }
    }

    pub fn read_int(&mut self) -> Result<i32> {
        Ok(self.read_field(ScalarKind::Int)?.as_int().unwrap_or_default())
    }

    pub fn read_float(&mut self) -> Result<f64> {
        Ok(self
            .read_field(ScalarKind::Float)?
            .as_float()
            .unwrap_or_default())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self
            .read_field(ScalarKind::Bool)?
            .as_bool()
            .unwrap_or_default())
    }

    /// Read a string field; `(null)` reads as the empty string.
    pub fn read_string(&mut self) -> Result<String> {
        Ok(self
            .read_field(ScalarKind::Str)?
            .into_string()
            .unwrap_or_default())
    }

    /// Whether EOF has been observed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the channel. Buffered bytes are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    fn take_buffered_line(&mut self) -> Result<Option<String>> {
        let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
            if self.buf.len() > self.config.max_line_len {
                let len = self.buf.len();
                self.buf.clear();
                return Err(LineError::LineTooLong {
                    len,
                    max: self.config.max_line_len,
                });
            }
            return Ok(None);
        };

        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        if line.len() > self.config.max_line_len {
            return Err(LineError::LineTooLong {
                len: line.len(),
                max: self.config.max_line_len,
            });
        }
        String::from_utf8(line.to_vec())
            .map(Some)
            .map_err(|_| LineError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Write;
    use std::thread;

    use uibridge_transport::Channel;

    use super::*;
    use crate::config::RetryPolicy;

    fn fast_config() -> LineConfig {
        LineConfig {
            retry: RetryPolicy {
                attempts: 4,
                interval: Duration::from_millis(10),
            },
            ..LineConfig::default()
        }
    }

    #[test]
    fn nothing_ready_returns_none_immediately() {
        let (_host, ui) = Channel::pair().unwrap();
        let mut reader = LineReader::new(ui);

        let start = Instant::now();
        assert!(reader.try_read_line().unwrap().is_none());
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn reads_lines_in_order() {
        let (mut host, ui) = Channel::pair().unwrap();
        host.write_all(b"control\n5\n0.2500000000\n").unwrap();

        let mut reader = LineReader::new(ui);
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some("control"));
        assert_eq!(reader.read_int().unwrap(), 5);
        assert_eq!(reader.read_float().unwrap(), 0.25);
        assert!(reader.try_read_line().unwrap().is_none());
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let (mut host, ui) = Channel::pair().unwrap();
        let mut reader = LineReader::new(ui);

        host.write_all(b"sho").unwrap();
        assert!(reader.try_read_line().unwrap().is_none());
        host.write_all(b"w\n").unwrap();
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some("show"));
    }

    #[test]
    fn empty_line_is_a_line() {
        let (mut host, ui) = Channel::pair().unwrap();
        host.write_all(b"\n").unwrap();
        let mut reader = LineReader::new(ui);
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some(""));
    }

    #[test]
    fn field_arriving_late_is_picked_up() {
        let (mut host, ui) = Channel::pair().unwrap();
        let mut reader = LineReader::new(ui);

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(120));
            host.write_all(b"42\n").unwrap();
            host
        });

        let start = Instant::now();
        assert_eq!(reader.read_int().unwrap(), 42);
        assert!(start.elapsed() < Duration::from_millis(900));
        let _host = writer.join().unwrap();
    }

    #[test]
    fn silent_peer_yields_defaults_within_one_second() {
        let (_host, ui) = Channel::pair().unwrap();
        let mut reader = LineReader::new(ui);

        for kind in [
            ScalarKind::Int,
            ScalarKind::Float,
            ScalarKind::Bool,
            ScalarKind::Str,
        ] {
            let start = Instant::now();
            let value = reader.read_field(kind).unwrap();
            let waited = start.elapsed();
            assert_eq!(value, kind.default_value());
            assert!(waited >= Duration::from_millis(900), "{kind}: {waited:?}");
            assert!(waited <= Duration::from_millis(1100), "{kind}: {waited:?}");
        }
    }

    #[test]
    fn strict_read_reports_timeout() {
        let (_host, ui) = Channel::pair().unwrap();
        let mut reader = LineReader::with_config(ui, fast_config());

        let err = reader.read_field_strict(ScalarKind::Int).unwrap_err();
        assert!(matches!(
            err,
            LineError::Timeout {
                kind: ScalarKind::Int,
                ..
            }
        ));
    }

    #[test]
    fn malformed_field_falls_back_to_default() {
        let (mut host, ui) = Channel::pair().unwrap();
        host.write_all(b"five\n7\n").unwrap();
        let mut reader = LineReader::with_config(ui, fast_config());

        assert!(matches!(
            reader.read_field_strict(ScalarKind::Int),
            Err(LineError::Malformed { .. })
        ));
        assert_eq!(reader.read_int().unwrap(), 7);
    }

    #[test]
    fn string_field_restores_newlines() {
        let (mut host, ui) = Channel::pair().unwrap();
        host.write_all(b"first\rsecond\n(null)\n").unwrap();
        let mut reader = LineReader::with_config(ui, fast_config());

        assert_eq!(reader.read_string().unwrap(), "first\nsecond");
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn eof_is_a_channel_fault() {
        let (host, ui) = Channel::pair().unwrap();
        drop(host);
        let mut reader = LineReader::with_config(ui, fast_config());

        assert!(matches!(
            reader.try_read_line(),
            Err(LineError::ChannelClosed)
        ));
        assert!(reader.is_closed());
        assert!(matches!(
            reader.read_field(ScalarKind::Int),
            Err(LineError::ChannelClosed)
        ));
    }

    #[test]
    fn buffered_lines_survive_peer_hangup() {
        let (mut host, ui) = Channel::pair().unwrap();
        host.write_all(b"hide\nquit\n").unwrap();
        drop(host);

        let mut reader = LineReader::new(ui);
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some("hide"));
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some("quit"));
        assert!(matches!(
            reader.try_read_line(),
            Err(LineError::ChannelClosed)
        ));
    }

    #[test]
    fn overlong_line_is_rejected_and_discarded() {
        let (mut host, ui) = Channel::pair().unwrap();
        let config = LineConfig {
            max_line_len: 8,
            read_chunk_size: 64,
            ..fast_config()
        };
        let mut reader = LineReader::with_config(ui, config);

        host.write_all(b"0123456789abcdef").unwrap();
        assert!(matches!(
            reader.try_read_line(),
            Err(LineError::LineTooLong { .. })
        ));
        host.write_all(b"\nok\n").unwrap();
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some(""));
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn invalid_utf8_is_a_framing_error() {
        let mut reader = LineReader::with_config(
            Scripted::new([Step::Data(vec![0xff, 0xfe, b'\n']), Step::Data(b"1\n".to_vec())]),
            fast_config(),
        );
        assert!(matches!(
            reader.read_field_strict(ScalarKind::Int),
            Err(LineError::InvalidUtf8)
        ));
        assert_eq!(reader.read_int().unwrap(), 1);
    }

    #[test]
    fn interrupted_and_would_block_reads_are_not_faults() {
        let mut reader = LineReader::with_config(
            Scripted::new([
                Step::Fail(ErrorKind::Interrupted),
                Step::Data(b"fo".to_vec()),
                Step::Fail(ErrorKind::WouldBlock),
                Step::Data(b"cus\n".to_vec()),
            ]),
            fast_config(),
        );
        assert!(reader.try_read_line().unwrap().is_none());
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some("focus"));
    }

    #[test]
    fn other_read_errors_propagate() {
        let mut reader = LineReader::new(Scripted::new([Step::Fail(ErrorKind::BrokenPipe)]));
        let err = reader.try_read_line().unwrap_err();
        assert!(err.is_channel_fault());
    }

    enum Step {
        Data(Vec<u8>),
        Fail(ErrorKind),
    }

    /// Always-ready source that replays scripted reads, then reports
    /// would-block forever.
    struct Scripted {
        steps: std::cell::RefCell<VecDeque<Step>>,
    }

    impl Scripted {
        fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: std::cell::RefCell::new(steps.into_iter().collect()),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.get_mut().pop_front() {
                Some(Step::Data(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Some(Step::Fail(kind)) => Err(std::io::Error::from(kind)),
                None => Err(std::io::Error::from(ErrorKind::WouldBlock)),
            }
        }
    }

    impl WaitReadable for Scripted {
        fn wait_readable(&self, _timeout: Duration) -> std::io::Result<bool> {
            Ok(!self.steps.borrow().is_empty())
        }
    }
}
