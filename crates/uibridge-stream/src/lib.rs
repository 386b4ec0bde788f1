//! Engine event streams for hosts that reach the engine over the network.
//!
//! The engine pushes text lines over a long-lived HTTP response:
//! - `Carla: <action> <pluginId> <value1> <value2> <value3> <valueStr>` events
//! - `Peaks: <pluginId> <in1> <in2> <out1> <out2>` meter updates
//! - a `Keep-Alive` sentinel asking the client to reconnect
//!
//! [`StreamReassembler`] rebuilds lines from non-blocking reads and
//! [`StreamSupervisor`] routes them, reconnecting through a
//! [`StreamConnector`] such as [`HttpStreamConnector`].

pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod reassembler;
pub mod supervisor;

pub use config::{HttpConnectorConfig, StreamConfig};
pub use error::{EventParseError, Result, StreamError};
pub use event::{EngineCallback, EngineEvent, PeakTable, PeaksEvent, StreamLine};
pub use http::{HttpStream, HttpStreamConnector};
pub use reassembler::StreamReassembler;
pub use supervisor::{PumpReport, StreamConnector, StreamSupervisor};
