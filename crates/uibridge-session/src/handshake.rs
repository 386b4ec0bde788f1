use std::io::Read;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uibridge_line::{LineReader, MessageSender, Scalar};
use uibridge_transport::WaitReadable;

use crate::error::{Result, SessionError};

/// Announce that the UI is up: a single empty line.
pub fn announce_ready<W: std::io::Write>(sender: &MessageSender<W>) -> Result<()> {
    sender.send(&[Scalar::from("")])?;
    debug!("ready announced");
    Ok(())
}

/// Wait for the UI's ready line.
///
/// Lines that arrive before it are logged and dropped. Returns how long the
/// wait took.
pub fn await_ready<R: Read + WaitReadable>(
    reader: &mut LineReader<R>,
    timeout: Duration,
) -> Result<Duration> {
    let started = Instant::now();
    let deadline = started + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(SessionError::ReadyTimeout(timeout));
        }
        match reader.read_line_within(remaining)? {
            Some(line) if line.is_empty() => {
                let waited = started.elapsed();
                info!(waited_ms = waited.as_millis() as u64, "UI is ready");
                return Ok(waited);
            }
            Some(line) => warn!(line = %line, "ignoring line received before ready"),
            None => return Err(SessionError::ReadyTimeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use uibridge_line::LineError;
    use uibridge_transport::Channel;

    use super::*;

    #[test]
    fn ready_roundtrip() {
        let (host, ui) = Channel::pair().unwrap();
        let sender = MessageSender::new(ui);
        announce_ready(&sender).unwrap();

        let mut reader = LineReader::new(host);
        let waited = await_ready(&mut reader, Duration::from_secs(1)).unwrap();
        assert!(waited < Duration::from_secs(1));
    }

    #[test]
    fn chatter_before_ready_is_dropped() {
        let (host, mut ui) = Channel::pair().unwrap();
        ui.write_all(b"hello\n\nshow\n").unwrap();

        let mut reader = LineReader::new(host);
        await_ready(&mut reader, Duration::from_secs(1)).unwrap();
        assert_eq!(reader.try_read_line().unwrap().as_deref(), Some("show"));
    }

    #[test]
    fn silent_ui_times_out() {
        let (host, _ui) = Channel::pair().unwrap();
        let mut reader = LineReader::new(host);

        let start = Instant::now();
        let err = await_ready(&mut reader, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, SessionError::ReadyTimeout(_)));
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn ui_vanishing_is_a_disconnect() {
        let (host, ui) = Channel::pair().unwrap();
        drop(ui);
        let mut reader = LineReader::new(host);

        let err = await_ready(&mut reader, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SessionError::Line(LineError::ChannelClosed)));
        assert!(err.is_disconnect());
    }
}
