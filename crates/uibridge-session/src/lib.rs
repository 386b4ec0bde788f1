//! Host/UI sessions over the UI bridge line protocol.
//!
//! A [`PipeSession`] is one end of the conversation. The host side issues
//! commands (`show`, `control`, `uiOptions`, ...); the UI side announces
//! itself with an empty line, reports edits back and says `exiting` when
//! it closes on its own. Inbound traffic is decoded by a [`Dispatcher`]
//! into [`Command`] values and routed to a [`UiHandler`].
//!
//! Nothing here spawns threads. The owner drives [`PipeSession::idle`]
//! from its own timer.

pub mod command;
pub mod connector;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod listener;
pub mod session;

pub use command::{Command, Keyword, UiOptions};
pub use connector::{connect, connect_with_config, from_fd_args, from_fds, host_pipes};
pub use dispatcher::{DispatchState, Dispatcher, Inbound};
pub use error::{Result, SessionError};
pub use handler::{deliver, UiHandler};
pub use handshake::{announce_ready, await_ready};
pub use listener::SessionListener;
pub use session::{PipeSession, Role, SessionConfig};
