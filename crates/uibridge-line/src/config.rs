use std::time::Duration;

/// Default cap on a single line: 1 MiB (base64 atom payloads can be large).
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

const DEFAULT_READ_CHUNK_SIZE: usize = 4 * 1024;

/// Bounded wait used when a field the peer owes us has not arrived yet.
///
/// The reader checks for a line, then waits up to `interval` for readiness,
/// for at most `attempts` intervals. With the defaults a missing field costs
/// at most one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 20;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

    /// Total time one field read may wait.
    pub fn window(&self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: Self::DEFAULT_ATTEMPTS,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

/// Configuration for line reading.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Longest line accepted before the reader reports a framing error.
    pub max_line_len: usize,
    /// Bytes requested from the channel per read.
    pub read_chunk_size: usize,
    /// Bounded wait for argument fields.
    pub retry: RetryPolicy,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_one_second() {
        assert_eq!(RetryPolicy::default().window(), Duration::from_millis(1000));
    }

    #[test]
    fn window_scales_with_policy() {
        let policy = RetryPolicy {
            attempts: 4,
            interval: Duration::from_millis(10),
        };
        assert_eq!(policy.window(), Duration::from_millis(40));
    }
}
