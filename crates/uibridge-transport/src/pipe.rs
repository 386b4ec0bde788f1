use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use tracing::debug;

use crate::channel::Channel;
use crate::error::Result;

/// Create one anonymous pipe, returning `(read_end, write_end)`.
///
/// Both ends are close-on-exec; see [`ChildPipes::make_inheritable`] for the
/// ends that must survive into a child process.
pub fn anonymous_pipe() -> Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` is a valid two-element array for pipe(2) to fill.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    // SAFETY: pipe(2) succeeded, so both descriptors are open and owned by us.
    let (read_end, write_end) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(read_end.as_raw_fd(), true)?;
    set_cloexec(write_end.as_raw_fd(), true)?;
    Ok((read_end, write_end))
}

/// Pipe ends destined for the UI process.
#[derive(Debug)]
pub struct ChildPipes {
    recv: OwnedFd,
    send: OwnedFd,
}

impl ChildPipes {
    /// Descriptor the child reads host messages from.
    pub fn recv_fd(&self) -> RawFd {
        self.recv.as_raw_fd()
    }

    /// Descriptor the child writes its messages to.
    pub fn send_fd(&self) -> RawFd {
        self.send.as_raw_fd()
    }

    /// Descriptor numbers formatted for the child's command line, `[recv, send]`.
    pub fn fd_args(&self) -> [String; 2] {
        [self.recv_fd().to_string(), self.send_fd().to_string()]
    }

    /// Clear close-on-exec so both ends are inherited by a spawned child.
    pub fn make_inheritable(&self) -> Result<()> {
        set_cloexec(self.recv_fd(), false)?;
        set_cloexec(self.send_fd(), false)
    }

    /// Give up ownership of the descriptors, returning `(recv, send)`.
    pub fn into_raw_fds(self) -> (RawFd, RawFd) {
        (self.recv.into_raw_fd(), self.send.into_raw_fd())
    }

    /// Turn the child ends into a channel in this process.
    pub fn into_channel(self) -> Channel {
        Channel::from_pipes(self.recv, self.send)
    }
}

/// Create the two pipes that connect a host to a UI process.
///
/// Returns the host's channel and the ends the UI side must use. The host
/// reads what the UI writes and vice versa.
pub fn duplex_pipes() -> Result<(Channel, ChildPipes)> {
    let (host_recv, child_send) = anonymous_pipe()?;
    let (child_recv, host_send) = anonymous_pipe()?;
    debug!(
        host_recv = host_recv.as_raw_fd(),
        host_send = host_send.as_raw_fd(),
        child_recv = child_recv.as_raw_fd(),
        child_send = child_send.as_raw_fd(),
        "created duplex pipes"
    );

    let host = Channel::from_pipes(host_recv, host_send);
    let child = ChildPipes {
        recv: child_recv,
        send: child_send,
    };
    Ok((host, child))
}

fn set_cloexec(fd: RawFd, enabled: bool) -> Result<()> {
    // SAFETY: fcntl on an open descriptor with F_GETFD/F_SETFD has no memory effects.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    let updated = if enabled {
        flags | libc::FD_CLOEXEC
    } else {
        flags & !libc::FD_CLOEXEC
    };
    // SAFETY: as above.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, updated) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}
