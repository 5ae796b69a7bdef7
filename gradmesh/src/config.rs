//! Runtime protocol configuration.
//!
//! Every interval the protocol runs on is overridable per deployment; the
//! defaults match a battery-powered sensor network where announcements cost
//! real energy. None of these values affect memory layout, so configuration
//! is a plain runtime struct rather than a compile-time parameter.

use crate::time::Duration;
use crate::types::{CHANNEL, MAX_NEIGHBORS};

/// Default neighbor liveness timeout.
pub const DEFAULT_NEIGHBOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between unconditional announcement bumps.
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(30);

/// Default interval between periodic data originations.
pub const DEFAULT_DATA_INTERVAL: Duration = Duration::from_secs(60);

/// Default exclusive upper bound on the origination jitter delay.
pub const DEFAULT_JITTER_MAX: Duration = Duration::from_secs(10);

/// Temperature is sampled on every Nth origination; light on every one.
pub const DEFAULT_TEMPERATURE_PERIOD: u32 = 5;

/// Protocol configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// A neighbor is evicted this long after its last announcement.
    pub neighbor_timeout: Duration,
    /// Unconditional re-broadcast interval (the self-healing bump).
    pub announce_interval: Duration,
    /// Periodic data origination interval.
    pub data_interval: Duration,
    /// Origination jitter: uniform random in `[0, jitter_max)`, applied to
    /// periodic originations to desynchronize senders sharing the channel.
    pub jitter_max: Duration,
    /// Neighbor pool capacity. Insertions beyond this are silently dropped.
    pub neighbor_capacity: usize,
    /// Temperature sampling cadence in originations.
    pub temperature_period: u32,
    /// Announcement channel identifier.
    pub channel: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            neighbor_timeout: DEFAULT_NEIGHBOR_TIMEOUT,
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
            data_interval: DEFAULT_DATA_INTERVAL,
            jitter_max: DEFAULT_JITTER_MAX,
            neighbor_capacity: MAX_NEIGHBORS,
            temperature_period: DEFAULT_TEMPERATURE_PERIOD,
            channel: CHANNEL,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the neighbor liveness timeout.
    pub fn with_neighbor_timeout(mut self, timeout: Duration) -> Self {
        self.neighbor_timeout = timeout;
        self
    }

    /// Set the periodic announcement interval.
    pub fn with_announce_interval(mut self, interval: Duration) -> Self {
        self.announce_interval = interval;
        self
    }

    /// Set the periodic data origination interval.
    pub fn with_data_interval(mut self, interval: Duration) -> Self {
        self.data_interval = interval;
        self
    }

    /// Set the origination jitter bound.
    pub fn with_jitter_max(mut self, jitter: Duration) -> Self {
        self.jitter_max = jitter;
        self
    }

    /// Set the neighbor pool capacity.
    pub fn with_neighbor_capacity(mut self, capacity: usize) -> Self {
        self.neighbor_capacity = capacity;
        self
    }

    /// Set the temperature sampling cadence.
    pub fn with_temperature_period(mut self, period: u32) -> Self {
        self.temperature_period = period.max(1);
        self
    }

    /// Set the announcement channel identifier.
    pub fn with_channel(mut self, channel: u16) -> Self {
        self.channel = channel;
        self
    }
}
