use std::io;
use std::time::Duration;

/// A readable endpoint that can wait, with a timeout, for data to arrive.
///
/// Returning `Ok(true)` means a subsequent `read` will not block: either
/// bytes are available or the peer hung up (and `read` reports EOF).
pub trait WaitReadable {
    /// Wait up to `timeout` for the endpoint to become readable.
    ///
    /// A zero timeout performs a non-blocking readiness check.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool>;
}

impl<T: WaitReadable + ?Sized> WaitReadable for &T {
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        (**self).wait_readable(timeout)
    }
}

impl<T: WaitReadable + ?Sized> WaitReadable for Box<T> {
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        (**self).wait_readable(timeout)
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::File;
    use std::io;
    use std::os::fd::{AsRawFd, RawFd};
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    use super::WaitReadable;

    /// `poll(2)` a single descriptor for input.
    pub(crate) fn poll_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        // Round up so a sub-millisecond remainder still waits instead of spinning.
        let millis = timeout.as_micros().div_ceil(1000);
        let millis = millis.min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `pfd` is a valid, writable pollfd and we pass a count of exactly one.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(false);
        }
        if pfd.revents & libc::POLLNVAL != 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        Ok(pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
    }

    impl WaitReadable for UnixStream {
        fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
            poll_readable(self.as_raw_fd(), timeout)
        }
    }

    impl WaitReadable for File {
        fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
            poll_readable(self.as_raw_fd(), timeout)
        }
    }
}

#[cfg(unix)]
pub(crate) use unix::poll_readable;
