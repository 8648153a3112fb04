use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Throughput of a single transfer in bits per second.
///
/// One sample per download, no smoothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Bandwidth(u64);

impl Bandwidth {
    pub const fn from_bps(bits_per_second: u64) -> Self {
        Self(bits_per_second)
    }

    /// `bytes * 8 / elapsed`. A transfer that took no measurable time saturates
    /// to `u64::MAX`.
    pub fn from_transfer(bytes: usize, elapsed: Duration) -> Self {
        let nanos = elapsed.as_nanos();
        if nanos == 0 {
            return Self(u64::MAX);
        }
        let bits = bytes as u128 * 8;
        let bps = bits * 1_000_000_000 / nanos;
        Self(u64::try_from(bps).unwrap_or(u64::MAX))
    }

    pub fn bits_per_second(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bps", self.0)
    }
}
