//! Clock-offset estimation against server timestamps.
//!
//! A lightweight NTP-style estimator for a single client/server pair. Each
//! round-trip sample `(T1 client send, T2 server time, T3 client receive)`
//! yields a raw offset which is folded into an exponentially smoothed
//! estimate. There is no outlier rejection; draft timers only need
//! second-level accuracy.

use std::sync::atomic::{AtomicU64, Ordering};

/// Weight kept from the previous estimate on each new sample.
pub const RETAINED_WEIGHT: f64 = 0.8;
/// Weight given to the newest raw sample.
pub const SAMPLE_WEIGHT: f64 = 0.2;

/// Source of local wall-clock time in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        shared::get_timestamp()
    }
}

/// Hand-driven clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Current offset and latency estimate.
///
/// `offset_ms` stays `None` until the first round-trip sample; callers must
/// not read that as a zero offset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockEstimate {
    pub offset_ms: Option<f64>,
    pub last_ping_ms: u64,
    pub samples: u32,
}

#[derive(Debug, Default)]
pub struct ClockSynchronizer {
    estimate: ClockEstimate,
}

impl ClockSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn estimate(&self) -> ClockEstimate {
        self.estimate
    }

    pub fn offset_ms(&self) -> Option<f64> {
        self.estimate.offset_ms
    }

    pub fn ping_ms(&self) -> u64 {
        self.estimate.last_ping_ms
    }

    /// Folds one round-trip sample into the estimate.
    ///
    /// `client_sent_at` is T1, `server_time` is T2 and `received_at` is T3,
    /// all in milliseconds. Returns the raw offset of this sample.
    pub fn observe_round_trip(
        &mut self,
        client_sent_at: u64,
        server_time: u64,
        received_at: u64,
    ) -> f64 {
        let rtt = received_at as f64 - client_sent_at as f64;
        let estimated_server_now = server_time as f64 + rtt / 2.0;
        let raw_offset = estimated_server_now - received_at as f64;

        self.estimate.offset_ms = Some(match self.estimate.offset_ms {
            None => raw_offset,
            Some(previous) => RETAINED_WEIGHT * previous + SAMPLE_WEIGHT * raw_offset,
        });
        self.estimate.samples += 1;
        self.record_ping(server_time, received_at);

        raw_offset
    }

    /// Updates the ping estimate from a server-initiated heartbeat.
    pub fn observe_heartbeat(&mut self, server_time: u64, received_at: u64) {
        self.record_ping(server_time, received_at);
    }

    /// Estimated server time for a given local time, once a sample exists.
    pub fn server_now(&self, local_now: u64) -> Option<u64> {
        self.estimate
            .offset_ms
            .map(|offset| (local_now as f64 + offset).round().max(0.0) as u64)
    }

    // Skewed clocks can put T2 after T3; the ping floors at zero.
    fn record_ping(&mut self, server_time: u64, received_at: u64) {
        self.estimate.last_ping_ms = received_at.saturating_sub(server_time);
    }
}
