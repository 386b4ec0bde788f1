use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::readiness::{poll_readable, WaitReadable};

/// A connected duplex channel to the peer process.
///
/// Reads come from the receive side, writes go to the send side. For socket
/// channels both sides are the same descriptor; for pipe channels they are
/// two separate descriptors.
pub struct Channel {
    inner: ChannelInner,
}

enum ChannelInner {
    Socket(UnixStream),
    Pipes { recv: File, send: File },
}

impl Channel {
    /// Wrap a connected Unix domain socket stream.
    pub fn from_socket(stream: UnixStream) -> Self {
        Self {
            inner: ChannelInner::Socket(stream),
        }
    }

    /// Wrap an owned receive descriptor and an owned send descriptor.
    pub fn from_pipes(recv: OwnedFd, send: OwnedFd) -> Self {
        Self {
            inner: ChannelInner::Pipes {
                recv: File::from(recv),
                send: File::from(send),
            },
        }
    }

    /// Create two connected in-process channels.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((Self::from_socket(left), Self::from_socket(right)))
    }

    /// Take ownership of raw pipe descriptors inherited from a parent process.
    ///
    /// Both descriptors are checked to be open before ownership is taken.
    /// The caller must not use or close them afterwards.
    pub fn from_raw_fds(recv: RawFd, send: RawFd) -> Result<Self> {
        check_descriptor(recv)?;
        check_descriptor(send)?;
        if recv == send {
            return Err(TransportError::InvalidDescriptor {
                value: recv.to_string(),
                reason: "receive and send descriptors must differ".to_string(),
            });
        }

        debug!(recv, send, "adopting inherited pipe descriptors");
        // SAFETY: both descriptors were verified open above and the caller hands us
        // exclusive ownership of them.
        let (recv, send) = unsafe { (OwnedFd::from_raw_fd(recv), OwnedFd::from_raw_fd(send)) };
        Ok(Self::from_pipes(recv, send))
    }

    /// Parse descriptor numbers passed on a command line and adopt them.
    pub fn from_fd_args(recv: &str, send: &str) -> Result<Self> {
        Self::from_raw_fds(parse_descriptor(recv)?, parse_descriptor(send)?)
    }

    /// Duplicate the channel's descriptors.
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            ChannelInner::Socket(stream) => ChannelInner::Socket(stream.try_clone()?),
            ChannelInner::Pipes { recv, send } => ChannelInner::Pipes {
                recv: recv.try_clone()?,
                send: send.try_clone()?,
            },
        };
        Ok(Self { inner })
    }

    /// Raw receive descriptor, for diagnostics and external poll loops.
    pub fn recv_fd(&self) -> RawFd {
        match &self.inner {
            ChannelInner::Socket(stream) => stream.as_raw_fd(),
            ChannelInner::Pipes { recv, .. } => recv.as_raw_fd(),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            ChannelInner::Socket(_) => "unix-socket",
            ChannelInner::Pipes { .. } => "pipe-pair",
        }
    }
}

fn parse_descriptor(value: &str) -> Result<RawFd> {
    let fd: RawFd = value
        .trim()
        .parse()
        .map_err(|_| TransportError::InvalidDescriptor {
            value: value.to_string(),
            reason: "not a descriptor number".to_string(),
        })?;
    if fd < 0 {
        return Err(TransportError::InvalidDescriptor {
            value: value.to_string(),
            reason: "negative descriptor".to_string(),
        });
    }
    Ok(fd)
}

fn check_descriptor(fd: RawFd) -> Result<()> {
    // SAFETY: F_GETFD only inspects the descriptor table entry.
    let rc = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if rc < 0 {
        return Err(TransportError::InvalidDescriptor {
            value: fd.to_string(),
            reason: std::io::Error::last_os_error().to_string(),
        });
    }
    Ok(())
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ChannelInner::Socket(stream) => stream.read(buf),
            ChannelInner::Pipes { recv, .. } => recv.read(buf),
        }
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ChannelInner::Socket(stream) => stream.write(buf),
            ChannelInner::Pipes { send, .. } => send.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            ChannelInner::Socket(stream) => stream.flush(),
            ChannelInner::Pipes { send, .. } => send.flush(),
        }
    }
}

impl WaitReadable for Channel {
    fn wait_readable(&self, timeout: Duration) -> std::io::Result<bool> {
        poll_readable(self.recv_fd(), timeout)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("type", &self.transport_name())
            .field("recv_fd", &self.recv_fd())
            .finish()
    }
}
