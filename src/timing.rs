//! Timing milestones for a single exchange.

use std::time::{Duration, Instant};

/// Milestones captured while one query/response exchange runs.
///
/// `start` and `end` always exist once the exchange returns. The wire
/// milestones are present only when the exchange actually reached that
/// point; a milestone that was never reached stays `None`, and the
/// figures derived from it are omitted rather than reported as zero.
#[derive(Debug, Clone, Copy)]
pub struct TimingTrace {
    /// Taken before the transport is dialed.
    pub start: Instant,
    /// Taken when the exchange returned, success or failure.
    pub end: Instant,
    /// Taken just before the query bytes are written.
    pub write_start: Option<Instant>,
    /// Taken once the query bytes are flushed.
    pub write_end: Option<Instant>,
    /// Taken when the first response bytes arrived.
    pub read_start: Option<Instant>,
}

/// Round-trip figures derived from a `TimingTrace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RttSample {
    /// Full exchange duration.
    pub total: Duration,
    /// Time spent writing the query.
    pub write_request: Option<Duration>,
    /// Write start until the first response bytes.
    pub response_header: Option<Duration>,
    /// Write start until the exchange finished.
    pub validate: Option<Duration>,
    /// First response bytes until the exchange finished.
    pub content: Option<Duration>,
}

impl TimingTrace {
    /// Derives round-trip figures from whichever milestones were captured.
    pub fn rtt(&self) -> RttSample {
        RttSample {
            total: self.end.saturating_duration_since(self.start),
            write_request: match (self.write_start, self.write_end) {
                (Some(started), Some(finished)) => {
                    Some(finished.saturating_duration_since(started))
                }
                _ => None,
            },
            response_header: match (self.write_start, self.read_start) {
                (Some(started), Some(first_bytes)) => {
                    Some(first_bytes.saturating_duration_since(started))
                }
                _ => None,
            },
            validate: self
                .write_start
                .map(|started| self.end.saturating_duration_since(started)),
            content: self
                .read_start
                .map(|first_bytes| self.end.saturating_duration_since(first_bytes)),
        }
    }
}

/// Converts a duration to whole microseconds, saturating at `u64::MAX`.
pub fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
