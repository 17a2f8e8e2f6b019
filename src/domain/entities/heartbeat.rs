//! Heartbeat timing and the advice timeout policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heartbeat cadence contract, in milliseconds.
///
/// Initially proposed by the client, then replaced by the server's advice on
/// every successful `/meta/connect` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Advice {
    #[serde(default)]
    pub timeout: u64,

    #[serde(default)]
    pub interval: u64,
}

impl Advice {
    pub fn new(timeout: u64, interval: u64) -> Self {
        Self { timeout, interval }
    }

    fn allowance_ms(&self) -> i64 {
        i64::try_from(self.timeout.saturating_add(self.interval)).unwrap_or(i64::MAX)
    }

    /// Decide whether the current heartbeat has timed out.
    ///
    /// A completed round trip (`end >= start`) is checked against
    /// `timeout + interval` alone. An in-flight or stale cycle (no `end`, or
    /// `end` older than `start`) gets an extra `monitor_interval` because the
    /// monitor only samples periodically.
    pub fn is_timed_out(
        &self,
        times: &HeartbeatTimes,
        now: DateTime<Utc>,
        monitor_interval: std::time::Duration,
    ) -> bool {
        let Some(start) = times.start else {
            return false;
        };

        match times.end {
            Some(end) if end >= start => (end - start).num_milliseconds() > self.allowance_ms(),
            _ => {
                let monitor_ms = i64::try_from(monitor_interval.as_millis()).unwrap_or(i64::MAX);
                (now - start).num_milliseconds() > self.allowance_ms().saturating_add(monitor_ms)
            }
        }
    }
}

/// Timestamps of the current heartbeat round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartbeatTimes {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl HeartbeatTimes {
    pub fn set_start(&mut self, at: DateTime<Utc>) {
        self.start = Some(at);
    }

    pub fn set_end(&mut self, at: DateTime<Utc>) {
        self.end = Some(at);
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
    }
}

impl std::fmt::Display for HeartbeatTimes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn text(value: Option<DateTime<Utc>>) -> String {
            value.map_or_else(|| "null".to_string(), |v| v.to_rfc3339())
        }
        write!(f, "Start: {}, End: {}", text(self.start), text(self.end))
    }
}
