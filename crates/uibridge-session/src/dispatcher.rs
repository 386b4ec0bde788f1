use std::io::Read;

use tracing::{debug, info, warn};
use uibridge_line::{LineError, LineReader};
use uibridge_transport::WaitReadable;

use crate::command::{Command, Keyword};
use crate::error::{Result, SessionError};
use crate::handler::{deliver, UiHandler};

/// Where the dispatcher is within the current message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    KeywordRead(Keyword),
    ArgumentsRead(Keyword),
    /// Terminal: `quit` or `exiting` was received, or the channel closed.
    Closed,
}

/// Result of one non-blocking receive attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// No complete keyword line is available yet.
    Nothing,
    /// A line that is not a keyword was read and dropped.
    Skipped(String),
    Command(Command),
}

/// Turns inbound lines into commands and hands them to a [`UiHandler`].
///
/// Reading the keyword never blocks. Once a keyword is in, its arguments are
/// read with the line reader's bounded wait; arguments that do not arrive in
/// time are replaced by defaults so the stream stays aligned.
pub struct Dispatcher<R> {
    reader: LineReader<R>,
    state: DispatchState,
    quit_received: bool,
}

impl<R: Read + WaitReadable> Dispatcher<R> {
    pub fn new(reader: LineReader<R>) -> Self {
        Self {
            reader,
            state: DispatchState::Idle,
            quit_received: false,
        }
    }

    /// Process at most one message.
    ///
    /// Returns `false` once the session should stop: after `quit`, after
    /// `exiting`, or when the channel has closed.
    pub fn pump<H: UiHandler + ?Sized>(&mut self, handler: &mut H) -> bool {
        match self.receive() {
            Ok(Inbound::Command(command)) => {
                deliver(handler, &command);
                !self.is_closed()
            }
            Ok(Inbound::Nothing | Inbound::Skipped(_)) => !self.is_closed(),
            Err(_) => false,
        }
    }

    /// Process every message that is already available.
    ///
    /// Intended to run from the owner's idle timer. Returns `false` once the
    /// session should stop.
    pub fn idle<H: UiHandler + ?Sized>(&mut self, handler: &mut H) -> bool {
        loop {
            match self.receive() {
                Ok(Inbound::Command(command)) => {
                    deliver(handler, &command);
                    if self.is_closed() {
                        return false;
                    }
                }
                Ok(Inbound::Skipped(_)) => {}
                Ok(Inbound::Nothing) => return !self.is_closed(),
                Err(_) => return false,
            }
        }
    }

    /// Read the next message without invoking any handler.
    ///
    /// Unknown keywords and unreadable keyword lines come back as
    /// [`Inbound::Skipped`]. A channel fault moves the dispatcher to
    /// [`DispatchState::Closed`] and is returned as an error.
    pub fn receive(&mut self) -> Result<Inbound> {
        if self.state == DispatchState::Closed {
            return Err(SessionError::Closed);
        }

        let line = match self.reader.try_read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(Inbound::Nothing),
            Err(err) if err.is_channel_fault() => return Err(self.fault(err)),
            Err(err) => {
                warn!(error = %err, "dropping unreadable keyword line");
                return Ok(Inbound::Skipped(String::new()));
            }
        };

        let Some(keyword) = Keyword::from_wire(&line) else {
            warn!(keyword = %line, "unknown keyword; skipping");
            return Ok(Inbound::Skipped(line));
        };
        self.state = DispatchState::KeywordRead(keyword);

        let mut fields = Vec::with_capacity(keyword.arg_kinds().len());
        for kind in keyword.arg_kinds() {
            match self.reader.read_field(*kind) {
                Ok(value) => fields.push(value),
                Err(err) => {
                    debug!(%keyword, "channel closed while reading arguments");
                    return Err(self.fault(err));
                }
            }
        }
        self.state = DispatchState::ArgumentsRead(keyword);

        let command = match Command::from_fields(keyword, fields) {
            Ok(command) => command,
            Err(err) => {
                warn!(%keyword, error = %err, "discarding message");
                self.state = DispatchState::Idle;
                return Ok(Inbound::Skipped(line));
            }
        };

        match keyword {
            Keyword::Quit => {
                info!("quit received");
                self.quit_received = true;
                self.state = DispatchState::Closed;
            }
            Keyword::Exiting => {
                info!("peer is exiting");
                self.state = DispatchState::Closed;
            }
            _ => self.state = DispatchState::Idle,
        }
        debug!(%keyword, "received");
        Ok(Inbound::Command(command))
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == DispatchState::Closed
    }

    /// Whether the peer sent `quit`.
    pub fn quit_received(&self) -> bool {
        self.quit_received
    }

    pub fn reader(&self) -> &LineReader<R> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut LineReader<R> {
        &mut self.reader
    }

    fn fault(&mut self, err: LineError) -> SessionError {
        if !self.is_closed() {
            debug!(error = %err, "channel fault; dispatcher closed");
        }
        self.state = DispatchState::Closed;
        SessionError::Line(err)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::{Duration, Instant};

    use uibridge_line::{LineConfig, RetryPolicy};
    use uibridge_transport::Channel;

    use super::*;

    fn dispatcher(config: LineConfig) -> (Channel, Dispatcher<Channel>) {
        let (host, ui) = Channel::pair().unwrap();
        (host, Dispatcher::new(LineReader::with_config(ui, config)))
    }

    fn fast() -> LineConfig {
        LineConfig {
            retry: RetryPolicy {
                attempts: 5,
                interval: Duration::from_millis(10),
            },
            ..LineConfig::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        controls: Vec<(i32, f64)>,
        notes: Vec<(bool, i32, i32, i32)>,
        shown: usize,
        quit: bool,
    }

    impl UiHandler for Recorder {
        fn on_control(&mut self, index: i32, value: f64) {
            self.controls.push((index, value));
        }

        fn on_note(&mut self, on: bool, channel: i32, note: i32, velocity: i32) {
            self.notes.push((on, channel, note, velocity));
        }

        fn on_show(&mut self) {
            self.shown += 1;
        }

        fn on_quit(&mut self) {
            self.quit = true;
        }
    }

    #[test]
    fn nothing_ready_continues_without_waiting() {
        let (_host, mut dispatcher) = dispatcher(LineConfig::default());
        let mut recorder = Recorder::default();

        let start = Instant::now();
        assert!(dispatcher.pump(&mut recorder));
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn control_then_quit() {
        let (mut host, mut dispatcher) = dispatcher(LineConfig::default());
        host.write_all(b"control\n5\n0.2500000000\nquit\n").unwrap();
        let mut recorder = Recorder::default();

        assert!(dispatcher.pump(&mut recorder));
        assert_eq!(recorder.controls, [(5, 0.25)]);
        assert!(!dispatcher.quit_received());

        assert!(!dispatcher.pump(&mut recorder));
        assert!(recorder.quit);
        assert!(dispatcher.quit_received());
        assert_eq!(dispatcher.state(), DispatchState::Closed);

        assert!(!dispatcher.pump(&mut recorder));
        assert!(matches!(dispatcher.receive(), Err(SessionError::Closed)));
    }

    #[test]
    fn unknown_keyword_is_skipped() {
        let (mut host, mut dispatcher) = dispatcher(LineConfig::default());
        host.write_all(b"volume\nshow\n").unwrap();
        let mut recorder = Recorder::default();

        assert!(dispatcher.pump(&mut recorder));
        assert_eq!(recorder.shown, 0);
        assert!(dispatcher.pump(&mut recorder));
        assert_eq!(recorder.shown, 1);
    }

    #[test]
    fn idle_drains_everything_available() {
        let (mut host, mut dispatcher) = dispatcher(LineConfig::default());
        host.write_all(b"show\nnote\ntrue\n0\n60\n100\nbogus\ncontrol\n1\n-1.0\n")
            .unwrap();
        let mut recorder = Recorder::default();

        assert!(dispatcher.idle(&mut recorder));
        assert_eq!(recorder.shown, 1);
        assert_eq!(recorder.notes, [(true, 0, 60, 100)]);
        assert_eq!(recorder.controls, [(1, -1.0)]);
    }

    #[test]
    fn idle_stops_at_quit() {
        let (mut host, mut dispatcher) = dispatcher(LineConfig::default());
        host.write_all(b"quit\nshow\n").unwrap();
        let mut recorder = Recorder::default();

        assert!(!dispatcher.idle(&mut recorder));
        assert!(recorder.quit);
        assert_eq!(recorder.shown, 0);
    }

    #[test]
    fn missing_arguments_use_defaults() {
        let (mut host, mut dispatcher) = dispatcher(fast());
        host.write_all(b"control\n5\n").unwrap();
        let mut recorder = Recorder::default();

        assert!(dispatcher.pump(&mut recorder));
        assert_eq!(recorder.controls, [(5, 0.0)]);
    }

    #[test]
    fn malformed_argument_uses_default() {
        let (mut host, mut dispatcher) = dispatcher(fast());
        host.write_all(b"control\nfive\n0.5\n").unwrap();
        let mut recorder = Recorder::default();

        assert!(dispatcher.pump(&mut recorder));
        assert_eq!(recorder.controls, [(0, 0.5)]);
    }

    #[test]
    fn hangup_mid_message_closes_without_delivery() {
        let (mut host, mut dispatcher) = dispatcher(fast());
        host.write_all(b"control\n5\n").unwrap();
        drop(host);
        let mut recorder = Recorder::default();

        assert!(!dispatcher.pump(&mut recorder));
        assert!(recorder.controls.is_empty());
        assert_eq!(dispatcher.state(), DispatchState::Closed);
        assert!(!dispatcher.quit_received());
    }

    #[test]
    fn hangup_while_idle_is_terminal() {
        let (host, mut dispatcher) = dispatcher(LineConfig::default());
        drop(host);

        assert!(!dispatcher.pump(&mut Recorder::default()));
        assert!(dispatcher.is_closed());
    }

    #[test]
    fn exiting_closes_without_quit() {
        let (mut host, mut dispatcher) = dispatcher(LineConfig::default());
        host.write_all(b"exiting\n").unwrap();

        let mut seen: Vec<Command> = Vec::new();
        assert!(!dispatcher.pump(&mut seen));
        assert_eq!(seen, [Command::Exiting]);
        assert!(dispatcher.is_closed());
        assert!(!dispatcher.quit_received());
    }

    #[test]
    fn ready_line_is_a_command() {
        let (mut host, mut dispatcher) = dispatcher(LineConfig::default());
        host.write_all(b"\npcontrol\nurn:gain\n0.5\n").unwrap();

        assert_eq!(dispatcher.receive().unwrap(), Inbound::Command(Command::Ready));
        assert_eq!(
            dispatcher.receive().unwrap(),
            Inbound::Command(Command::PControl {
                uri: "urn:gain".into(),
                value: 0.5
            })
        );
        assert_eq!(dispatcher.receive().unwrap(), Inbound::Nothing);
    }
}
