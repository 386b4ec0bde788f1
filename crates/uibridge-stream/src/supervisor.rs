use std::io::Read;

use tracing::{debug, info, trace, warn};

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::event::{EngineCallback, PeakTable, StreamLine};
use crate::reassembler::StreamReassembler;

/// Opens a fresh stream whenever the supervisor needs one.
pub trait StreamConnector {
    type Stream: Read;

    fn open(&mut self) -> Result<Self::Stream>;
}

impl<S: Read, F: FnMut() -> Result<S>> StreamConnector for F {
    type Stream = S;

    fn open(&mut self) -> Result<S> {
        (*self)()
    }
}

/// What one [`StreamSupervisor::pump`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub lines: usize,
    pub events: usize,
    pub peaks: usize,
    pub invalid: usize,
    /// A sentinel made the supervisor switch to a new stream.
    pub reconnected: bool,
    /// The stream ended and was dropped; the next pump opens a new one.
    pub ended: bool,
}

/// Drives a reconnecting engine event stream from the owner's idle timer.
///
/// Each [`pump`](Self::pump) reads what is available, routes event lines to
/// an [`EngineCallback`], records peak lines, and handles the sentinel by
/// opening a replacement stream before dropping the current one. At most
/// one reconnect happens per pump.
pub struct StreamSupervisor<C: StreamConnector> {
    connector: C,
    stream: Option<C::Stream>,
    reassembler: StreamReassembler,
    peaks: PeakTable,
    config: StreamConfig,
    closed_this_cycle: bool,
    reconnects: u64,
}

impl<C: StreamConnector> StreamSupervisor<C> {
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, StreamConfig::default())
    }

    pub fn with_config(connector: C, config: StreamConfig) -> Self {
        Self {
            connector,
            stream: None,
            reassembler: StreamReassembler::new(&config),
            peaks: PeakTable::new(config.peak_slots),
            config,
            closed_this_cycle: false,
            reconnects: 0,
        }
    }

    /// Process everything currently available on the stream.
    ///
    /// Opens the stream first if there is none. Failing to open a stream,
    /// initially or as a sentinel replacement, is returned after the rest of
    /// the batch has been processed; the supervisor does not retry on its
    /// own.
    pub fn pump<E: EngineCallback + ?Sized>(&mut self, callback: &mut E) -> Result<PumpReport> {
        self.closed_this_cycle = false;
        let mut report = PumpReport::default();

        if self.stream.is_none() {
            let stream = self.connector.open()?;
            info!("event stream connected");
            self.reassembler.reset();
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(report);
        };

        let lines = match self.reassembler.pull_lines(stream) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(error = %err, "event stream read failed; dropping it");
                self.drop_stream();
                callback.on_disconnect();
                return Err(StreamError::Io(err));
            }
        };
        let ended = self.reassembler.is_exhausted();

        let mut deferred = None;
        for line in lines {
            report.lines += 1;
            match StreamLine::classify(&line, &self.config) {
                StreamLine::Event(event) => {
                    report.events += 1;
                    callback.on_event(&event);
                }
                StreamLine::Peaks(peaks) => {
                    report.peaks += 1;
                    if !self.peaks.update(&peaks) {
                        debug!(plugin_id = peaks.plugin_id, "peaks for unknown plugin slot");
                    }
                }
                StreamLine::Sentinel if self.closed_this_cycle => {
                    debug!("extra sentinel in this cycle; ignoring");
                }
                StreamLine::Sentinel => {
                    self.closed_this_cycle = true;
                    match self.reconnect() {
                        Ok(()) => report.reconnected = true,
                        Err(err) => {
                            callback.on_disconnect();
                            deferred = Some(err);
                        }
                    }
                }
                StreamLine::Invalid { line, error } => {
                    report.invalid += 1;
                    warn!(%line, %error, "undecodable stream line");
                }
                StreamLine::Other(line) => trace!(%line, "ignoring stream line"),
            }
        }

        if ended && !self.closed_this_cycle {
            info!("event stream ended");
            self.drop_stream();
            report.ended = true;
            callback.on_disconnect();
        }

        match deferred {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Last peak values recorded for `plugin_id`.
    pub fn peaks(&self, plugin_id: u32) -> Option<[f32; 4]> {
        self.peaks.get(plugin_id)
    }

    pub fn peak_table(&self) -> &PeakTable {
        &self.peaks
    }

    /// Whether a stream is currently open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Sentinel-triggered reconnects so far.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Close the current stream, if any.
    pub fn disconnect(&mut self) {
        self.drop_stream();
    }

    fn reconnect(&mut self) -> Result<()> {
        debug!("sentinel received; reconnecting");
        let replacement = match self.connector.open() {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "replacement stream failed to open");
                self.drop_stream();
                return Err(err);
            }
        };
        self.reassembler.reset();
        let previous = self.stream.replace(replacement);
        drop(previous);
        self.reconnects += 1;
        info!(reconnects = self.reconnects, "event stream reconnected");
        Ok(())
    }

    fn drop_stream(&mut self) {
        self.reassembler.reset();
        self.stream = None;
    }
}
