use std::os::fd::RawFd;
use std::path::Path;

use uibridge_transport::{duplex_pipes, Channel, ChildPipes, SocketListener};

use crate::error::Result;
use crate::session::{PipeSession, Role, SessionConfig};

/// Connect to a host's socket as a UI and announce readiness.
pub fn connect(path: impl AsRef<Path>) -> Result<PipeSession> {
    connect_with_config(path, SessionConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(path: impl AsRef<Path>, config: SessionConfig) -> Result<PipeSession> {
    let channel = SocketListener::connect(path)?;
    open_ui(channel, config)
}

/// Open a UI session on descriptors inherited from the host.
pub fn from_fds(recv: RawFd, send: RawFd, config: SessionConfig) -> Result<PipeSession> {
    open_ui(Channel::from_raw_fds(recv, send)?, config)
}

/// Open a UI session on descriptor numbers given on the command line.
pub fn from_fd_args(recv: &str, send: &str, config: SessionConfig) -> Result<PipeSession> {
    open_ui(Channel::from_fd_args(recv, send)?, config)
}

/// Create a host session over fresh pipes, returning the ends a UI process
/// must inherit.
///
/// The host should spawn the UI with [`ChildPipes::fd_args`], drop the
/// [`ChildPipes`] after spawning, then call [`PipeSession::await_ready`].
pub fn host_pipes(config: SessionConfig) -> Result<(PipeSession, ChildPipes)> {
    let (channel, child) = duplex_pipes()?;
    let session = PipeSession::new(channel, Role::Host, config)?;
    Ok((session, child))
}

fn open_ui(channel: Channel, config: SessionConfig) -> Result<PipeSession> {
    let session = PipeSession::new(channel, Role::Ui, config)?;
    session.send_ready()?;
    Ok(session)
}
