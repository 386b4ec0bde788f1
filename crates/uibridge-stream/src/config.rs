use std::time::Duration;

/// Configuration for stream reassembly and supervision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Prefix of engine event lines.
    pub event_marker: String,
    /// Prefix of peak meter lines.
    pub peaks_marker: String,
    /// Line that asks the client to reconnect. Matched exactly.
    pub sentinel: String,
    /// Bytes requested per read.
    pub chunk_size: usize,
    /// Reads allowed per pull, so one busy stream cannot starve the caller.
    pub max_chunks_per_pull: usize,
    /// Longest unterminated fragment kept between pulls.
    pub max_pending_len: usize,
    /// Number of plugin slots in the peak table.
    pub peak_slots: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            event_marker: "Carla: ".to_string(),
            peaks_marker: "Peaks: ".to_string(),
            sentinel: "Keep-Alive".to_string(),
            chunk_size: 4 * 1024,
            max_chunks_per_pull: 64,
            max_pending_len: 1024 * 1024,
            peak_slots: 99,
        }
    }
}

/// Configuration for [`HttpStreamConnector`](crate::HttpStreamConnector).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConnectorConfig {
    pub connect_timeout: Duration,
    /// Deadline for the status line and headers once the request is sent.
    pub header_timeout: Duration,
    /// Longest a single body read may wait before reporting would-block.
    pub poll_window: Duration,
}

impl Default for HttpConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            header_timeout: Duration::from_secs(5),
            poll_window: Duration::from_millis(1),
        }
    }
}
