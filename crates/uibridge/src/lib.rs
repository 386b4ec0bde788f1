//! Line-protocol bridge between audio plugin hosts and out-of-process UIs.
//!
//! uibridge carries host/UI conversations over pipes or Unix sockets using a
//! one-value-per-line text protocol, and follows an engine's HTTP event
//! stream for hosts that reach the engine over the network.
//!
//! # Crate Structure
//!
//! - [`transport`]: pipe pairs, inherited descriptors and Unix sockets
//! - [`line`]: scalar line codec, bounded-wait reader and atomic sender
//! - [`session`]: keyword vocabulary, dispatcher and host/UI sessions
//! - [`stream`]: engine event stream reassembly and reconnection (behind
//!   the `stream` feature)

/// Re-export transport types.
pub mod transport {
    pub use uibridge_transport::*;
}

/// Re-export line protocol types.
pub mod line {
    pub use uibridge_line::*;
}

/// Re-export session types.
pub mod session {
    pub use uibridge_session::*;
}

/// Re-export event stream types (requires `stream` feature).
#[cfg(feature = "stream")]
pub mod stream {
    pub use uibridge_stream::*;
}
