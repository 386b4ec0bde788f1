//! Duplex byte channels for the UI bridge.
//!
//! A [`Channel`] is the one endpoint a process holds towards its peer. It can
//! wrap:
//! - a pair of anonymous pipe descriptors (the classic host/UI bridge setup)
//! - a Unix domain socket stream
//! - an in-process socket pair (tests, embedded UIs)
//!
//! Every channel can be polled for read readiness with a timeout, which is
//! what the line reader builds its bounded wait on.

pub mod error;
pub mod readiness;

#[cfg(unix)]
pub mod channel;
#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use readiness::WaitReadable;

#[cfg(unix)]
pub use channel::Channel;
#[cfg(unix)]
pub use pipe::{anonymous_pipe, duplex_pipes, ChildPipes};
#[cfg(unix)]
pub use uds::SocketListener;
