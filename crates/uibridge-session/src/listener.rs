use std::path::Path;

use tracing::debug;
use uibridge_transport::SocketListener;

use crate::error::Result;
use crate::session::{PipeSession, Role, SessionConfig};

/// Host-side listener that accepts UI connections.
pub struct SessionListener {
    socket: SocketListener,
    config: SessionConfig,
}

impl SessionListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            socket: SocketListener::bind(path)?,
            config: SessionConfig::default(),
        })
    }

    /// Override the session config handed to accepted sessions.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept the next UI and wait for its ready line.
    pub fn accept(&self) -> Result<PipeSession> {
        let mut session = self.accept_unready()?;
        session.await_ready()?;
        Ok(session)
    }

    /// Accept the next UI without waiting for it to announce itself.
    pub fn accept_unready(&self) -> Result<PipeSession> {
        let channel = self.socket.accept()?;
        debug!(path = ?self.socket.path(), "UI connected");
        PipeSession::new(channel, Role::Host, self.config.clone())
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}
