use std::io::{ErrorKind, Write};
use std::sync::{Mutex, MutexGuard};

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::codec::{encode_scalar, Scalar};
use crate::error::{LineError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

struct SenderState<W> {
    inner: W,
    buf: BytesMut,
    closed: bool,
}

/// Writes whole messages to a channel, one message at a time.
///
/// A message is staged in a buffer under the sender's lock and written with
/// a single write-and-flush, so messages from different threads never
/// interleave. After the first failed write the sender refuses further
/// messages with [`LineError::ChannelClosed`].
pub struct MessageSender<W> {
    state: Mutex<SenderState<W>>,
}

impl<W: Write> MessageSender<W> {
    pub fn new(inner: W) -> Self {
        Self {
            state: Mutex::new(SenderState {
                inner,
                buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
                closed: false,
            }),
        }
    }

    /// Start a message. The sender stays locked until the guard is committed
    /// or dropped; dropping without commit discards the staged lines.
    pub fn begin(&self) -> SendGuard<'_, W> {
        let mut state = self.lock();
        state.buf.clear();
        SendGuard {
            state,
            fields: 0,
            committed: false,
        }
    }

    /// Send one message made of `fields`, keyword first.
    pub fn send(&self, fields: &[Scalar]) -> Result<()> {
        let mut guard = self.begin();
        for field in fields {
            guard.push_scalar(field);
        }
        guard.commit()
    }

    /// Whether a write has failed or [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Refuse all further messages.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Run `f` with the underlying writer while holding the lock.
    pub fn with_inner<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.lock().inner)
    }

    /// Consume the sender and return the writer.
    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .inner
    }

    fn lock(&self) -> MutexGuard<'_, SenderState<W>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A message being assembled under the sender's lock.
pub struct SendGuard<'a, W> {
    state: MutexGuard<'a, SenderState<W>>,
    fields: usize,
    committed: bool,
}

impl<W: Write> SendGuard<'_, W> {
    /// Stage one field.
    pub fn push(&mut self, value: impl Into<Scalar>) -> &mut Self {
        let value = value.into();
        self.push_scalar(&value)
    }

    pub fn push_scalar(&mut self, value: &Scalar) -> &mut Self {
        encode_scalar(value, &mut self.state.buf);
        self.fields += 1;
        self
    }

    /// Number of fields staged so far.
    pub fn len(&self) -> usize {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields == 0
    }

    /// Write and flush the staged message, then release the lock.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        if self.fields == 0 {
            return Err(LineError::EmptyMessage);
        }

        let state = &mut *self.state;
        if state.closed {
            state.buf.clear();
            return Err(LineError::ChannelClosed);
        }

        let result = write_all(&mut state.inner, &state.buf).and_then(|()| flush(&mut state.inner));
        let bytes = state.buf.len();
        state.buf.clear();

        match result {
            Ok(()) => {
                trace!(fields = self.fields, bytes, "message sent");
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "write failed; closing sender");
                state.closed = true;
                Err(err)
            }
        }
    }
}

impl<W> Drop for SendGuard<'_, W> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.buf.clear();
        }
    }
}

fn write_all<W: Write>(inner: &mut W, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(LineError::ChannelClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) if err.kind() == ErrorKind::BrokenPipe => return Err(LineError::ChannelClosed),
            Err(err) => return Err(LineError::Io(err)),
        }
    }
    Ok(())
}

fn flush<W: Write>(inner: &mut W) -> Result<()> {
    loop {
        match inner.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(LineError::Io(err)),
        }
    }
}
