use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uibridge_line::{LineConfig, LineReader, MessageSender, Scalar};
use uibridge_transport::Channel;

use crate::command::{Command, Keyword};
use crate::dispatcher::{DispatchState, Dispatcher, Inbound};
use crate::error::{Result, SessionError};
use crate::handler::UiHandler;
use crate::handshake;

/// Configuration for a [`PipeSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub line: LineConfig,
    /// How long a host waits for the UI's ready line.
    pub ready_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            ready_timeout: Duration::from_secs(5),
        }
    }
}

/// Which end of the channel a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The plugin host: issues commands, receives UI edits.
    Host,
    /// The plugin UI: announces itself, says `exiting` when it goes away.
    Ui,
}

/// One side of a host/UI conversation over a [`Channel`].
///
/// Owns the send path (shared, thread-safe) and the receive path (driven by
/// the owner's idle timer through [`pump`](Self::pump) or
/// [`idle`](Self::idle)).
pub struct PipeSession {
    role: Role,
    sender: Arc<MessageSender<Channel>>,
    dispatcher: Dispatcher<Channel>,
    config: SessionConfig,
    closed: bool,
}

impl PipeSession {
    /// Wrap a connected channel.
    pub fn new(channel: Channel, role: Role, config: SessionConfig) -> Result<Self> {
        let send_half = channel.try_clone()?;
        debug!(?role, transport = channel.transport_name(), "session opened");
        Ok(Self {
            role,
            sender: Arc::new(MessageSender::new(send_half)),
            dispatcher: Dispatcher::new(LineReader::with_config(channel, config.line.clone())),
            config,
            closed: false,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Shared handle to the send path, for senders on other threads.
    pub fn sender(&self) -> Arc<MessageSender<Channel>> {
        Arc::clone(&self.sender)
    }

    /// Send any command.
    pub fn send(&self, command: &Command) -> Result<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.sender.send(&command.to_fields())?;
        debug!(keyword = %command.keyword(), "sent");
        Ok(())
    }

    /// Announce that the UI is up.
    pub fn send_ready(&self) -> Result<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        handshake::announce_ready(&self.sender)
    }

    pub fn send_control(&self, index: i32, value: f64) -> Result<()> {
        self.send(&Command::Control { index, value })
    }

    pub fn send_program(&self, channel: i32, bank: i32, program: i32) -> Result<()> {
        self.send(&Command::Program {
            channel,
            bank,
            program,
        })
    }

    pub fn send_midi_program(&self, bank: i32, program: f64) -> Result<()> {
        self.send(&Command::MidiProgram { bank, program })
    }

    pub fn send_configure(&self, key: &str, value: &str) -> Result<()> {
        self.send(&Command::Configure {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn send_note(&self, on: bool, channel: i32, note: i32, velocity: i32) -> Result<()> {
        self.send(&Command::Note {
            on,
            channel,
            note,
            velocity,
        })
    }

    /// Report a URI-addressed parameter edit (`pcontrol`).
    pub fn send_parameter(&self, uri: &str, value: f64) -> Result<()> {
        self.send(&Command::PControl {
            uri: uri.to_string(),
            value,
        })
    }

    /// Block until the UI announces itself or the ready timeout passes.
    pub fn await_ready(&mut self) -> Result<Duration> {
        handshake::await_ready(self.dispatcher.reader_mut(), self.config.ready_timeout)
    }

    /// Process at most one inbound message. See [`Dispatcher::pump`].
    pub fn pump<H: UiHandler + ?Sized>(&mut self, handler: &mut H) -> bool {
        self.dispatcher.pump(handler)
    }

    /// Process all available inbound messages. See [`Dispatcher::idle`].
    pub fn idle<H: UiHandler + ?Sized>(&mut self, handler: &mut H) -> bool {
        self.dispatcher.idle(handler)
    }

    /// Read one inbound message without a handler.
    pub fn receive(&mut self) -> Result<Inbound> {
        self.dispatcher.receive()
    }

    pub fn state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    /// Whether the peer sent `quit`.
    pub fn quit_received(&self) -> bool {
        self.dispatcher.quit_received()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the session.
    ///
    /// A UI tells the host it is `exiting`, unless the host asked it to quit.
    /// Only the first call does anything.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = if self.role == Role::Ui && !self.quit_received() && !self.sender.is_closed() {
            info!("sending exiting");
            self.sender
                .send(&[Scalar::from(Keyword::Exiting.as_str())])
                .map_err(SessionError::from)
        } else {
            Ok(())
        };
        self.sender.close();
        result
    }
}

impl Drop for PipeSession {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "close on drop failed");
        }
    }
}

impl std::fmt::Debug for PipeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeSession")
            .field("role", &self.role)
            .field("state", &self.dispatcher.state())
            .field("closed", &self.closed)
            .finish()
    }
}
