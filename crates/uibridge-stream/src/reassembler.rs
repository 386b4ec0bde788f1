use std::borrow::Cow;
use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::{trace, warn};

use crate::config::StreamConfig;

/// Rebuilds whole lines from a non-blocking byte stream.
///
/// Chunks rarely end on a line boundary. The unterminated tail of each pull
/// is kept and prefixed to the next chunk, so lines come out whole no matter
/// how the bytes were split.
#[derive(Debug)]
pub struct StreamReassembler {
    pending: BytesMut,
    chunk: Vec<u8>,
    max_chunks: usize,
    max_pending: usize,
    exhausted: bool,
    deferred: Option<std::io::Error>,
}

impl StreamReassembler {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            pending: BytesMut::new(),
            chunk: vec![0u8; config.chunk_size.max(1)],
            max_chunks: config.max_chunks_per_pull.max(1),
            max_pending: config.max_pending_len,
            exhausted: false,
            deferred: None,
        }
    }

    /// Read what `source` has available and return the complete lines.
    ///
    /// Stops at would-block, at end of data, or after the configured number
    /// of reads. At end of data a pending fragment is returned once as a
    /// final line. Trailing `\r` is stripped from every line.
    ///
    /// A read error that follows complete lines is held back and returned by
    /// the next call, so those lines are not lost.
    pub fn pull_lines<S: Read + ?Sized>(&mut self, source: &mut S) -> std::io::Result<Vec<String>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let mut lines = Vec::new();
        self.exhausted = false;

        let mut reads = 0usize;
        while reads < self.max_chunks {
            let read = match source.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if lines.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    break;
                }
            };
            reads += 1;

            if read == 0 {
                self.exhausted = true;
                if !self.pending.is_empty() {
                    trace!(len = self.pending.len(), "flushing final fragment");
                    let fragment = self.pending.split();
                    lines.push(to_line(&fragment));
                }
                break;
            }

            self.pending.extend_from_slice(&self.chunk[..read]);
            self.split_complete(&mut lines);
        }

        Ok(lines)
    }

    /// Whether the last pull hit end of data.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Bytes of the unterminated fragment held for the next pull.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Forget the pending fragment, e.g. when switching to a new stream.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.exhausted = false;
        self.deferred = None;
    }

    fn split_complete(&mut self, lines: &mut Vec<String>) {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line = self.pending.split_to(pos + 1);
            lines.push(to_line(&line[..pos]));
        }
        if self.pending.len() > self.max_pending {
            warn!(
                len = self.pending.len(),
                max = self.max_pending,
                "dropping oversized unterminated fragment"
            );
            self.pending.clear();
        }
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(line) => line.to_string(),
        Cow::Owned(line) => {
            warn!(len = bytes.len(), "replacing invalid UTF-8 in stream line");
            line
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;

    /// Replays scripted reads, reporting would-block between them.
    pub(crate) struct Scripted {
        steps: VecDeque<Step>,
    }

    pub(crate) enum Step {
        Data(&'static [u8]),
        Pause,
        Eof,
        Fail(io::ErrorKind),
    }

    impl Scripted {
        pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
            }
        }

        pub(crate) fn push(&mut self, step: Step) {
            self.steps.push_back(step);
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.front_mut() {
                Some(Step::Data(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    *bytes = &bytes[n..];
                    if bytes.is_empty() {
                        self.steps.pop_front();
                    }
                    Ok(n)
                }
                Some(Step::Pause) => {
                    self.steps.pop_front();
                    Err(io::ErrorKind::WouldBlock.into())
                }
                Some(Step::Fail(kind)) => {
                    let kind = *kind;
                    self.steps.pop_front();
                    Err(kind.into())
                }
                Some(Step::Eof) => Ok(0),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }
    }

    fn reassembler() -> StreamReassembler {
        StreamReassembler::new(&StreamConfig::default())
    }

    #[test]
    fn invalid_utf8_is_replaced_without_losing_the_next_line() {
        let mut source = Scripted::new([Step::Data(b"Carla: 1 0 0 0 0.0 \xff\xfe\nCarla: 2 0 0 0 0.0 ok\n")]);
        let mut reassembler = reassembler();

        let lines = reassembler.pull_lines(&mut source).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Carla: 1 0 0 0 0.0 "));
        assert!(lines[0].contains('\u{FFFD}'));
        assert_eq!(lines[1], "Carla: 2 0 0 0 0.0 ok");
    }

    #[test]
    fn fragments_are_stitched_across_pulls() {
        let mut source = Scripted::new([
            Step::Data(b"AB"),
            Step::Pause,
            Step::Data(b"CD\n"),
            Step::Pause,
            Step::Data(b"EF\nGH"),
            Step::Pause,
        ]);
        let mut reassembler = reassembler();

        assert!(reassembler.pull_lines(&mut source).unwrap().is_empty());
        assert_eq!(reassembler.pending(), b"AB");
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["ABCD"]);
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["EF"]);
        assert_eq!(reassembler.pending(), b"GH");
        assert!(!reassembler.is_exhausted());
    }

    #[test]
    fn chunks_within_one_pull_are_joined() {
        let mut source = Scripted::new([Step::Data(b"AB"), Step::Data(b"CD\n"), Step::Data(b"EF\nGH")]);
        let mut reassembler = reassembler();

        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["ABCD", "EF"]);
        assert_eq!(reassembler.pending(), b"GH");
    }

    #[test]
    fn end_of_data_flushes_fragment_once() {
        let mut source = Scripted::new([Step::Data(b"one\ntwo"), Step::Eof]);
        let mut reassembler = reassembler();

        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["one", "two"]);
        assert!(reassembler.is_exhausted());
        assert!(reassembler.pending().is_empty());

        assert!(reassembler.pull_lines(&mut source).unwrap().is_empty());
        assert!(reassembler.is_exhausted());
    }

    #[test]
    fn late_bytes_are_picked_up() {
        let mut source = Scripted::new([Step::Data(b"x\n")]);
        let mut reassembler = reassembler();
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["x"]);

        source.push(Step::Data(b"late\n"));
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["late"]);
    }

    #[test]
    fn carriage_returns_are_trimmed() {
        let mut source = Scripted::new([Step::Data(b"Keep-Alive\r\nCarla: 1\r\n"), Step::Eof]);
        let mut reassembler = reassembler();

        assert_eq!(
            reassembler.pull_lines(&mut source).unwrap(),
            ["Keep-Alive", "Carla: 1"]
        );
    }

    #[test]
    fn empty_lines_are_kept() {
        let mut source = Scripted::new([Step::Data(b"\n\na\n")]);
        let mut reassembler = reassembler();
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["", "", "a"]);
    }

    #[test]
    fn reads_per_pull_are_bounded() {
        let config = StreamConfig {
            chunk_size: 2,
            max_chunks_per_pull: 2,
            ..StreamConfig::default()
        };
        let mut reassembler = StreamReassembler::new(&config);
        let mut source = Scripted::new([Step::Data(b"a\nb\nc\n")]);

        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["a", "b"]);
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["c"]);
    }

    #[test]
    fn oversized_fragment_is_dropped() {
        let config = StreamConfig {
            max_pending_len: 4,
            ..StreamConfig::default()
        };
        let mut reassembler = StreamReassembler::new(&config);
        let mut source = Scripted::new([Step::Data(b"0123456789"), Step::Pause, Step::Data(b"\nok\n")]);

        assert!(reassembler.pull_lines(&mut source).unwrap().is_empty());
        assert!(reassembler.pending().is_empty());
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["", "ok"]);
    }

    #[test]
    fn reset_forgets_fragment() {
        let mut source = Scripted::new([Step::Data(b"stale"), Step::Pause, Step::Data(b"fresh\n")]);
        let mut reassembler = reassembler();

        reassembler.pull_lines(&mut source).unwrap();
        reassembler.reset();
        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["fresh"]);
    }

    #[test]
    fn interrupted_reads_retry_and_errors_propagate() {
        let mut source = Scripted::new([
            Step::Fail(io::ErrorKind::Interrupted),
            Step::Data(b"ok\n"),
            Step::Fail(io::ErrorKind::ConnectionReset),
        ]);
        let mut reassembler = reassembler();

        assert_eq!(reassembler.pull_lines(&mut source).unwrap(), ["ok"]);
        let err = reassembler.pull_lines(&mut source).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(reassembler.pull_lines(&mut source).unwrap().is_empty());
    }
}
