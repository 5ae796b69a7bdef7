//! Core traits for transport, time, randomness, and sensor abstraction.
//!
//! These traits allow the protocol to be used with different:
//! - Link layers (802.15.4 radios, LoRa, simulation)
//! - Time sources (real hardware time, simulated time)
//! - Random number generators
//! - Sensor hardware (real boards, scripted test values)

use core::future::Future;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::time::Timestamp;
use crate::types::{Announcement, DataPacket, Event, Inbound, LinkAddr};

/// Queue size for transport channels.
pub const TRANSPORT_QUEUE_SIZE: usize = 8;

/// Queue size for the application event channel.
pub const EVENT_QUEUE_SIZE: usize = 16;

/// Queue size for the origination trigger channel.
pub const TRIGGER_QUEUE_SIZE: usize = 4;

/// Mutex type used for channels.
pub type ChannelMutex = CriticalSectionRawMutex;

/// Incoming transport message channel type.
pub type TransportInChannel = Channel<ChannelMutex, Inbound, TRANSPORT_QUEUE_SIZE>;

/// Outbound announcement bump channel type.
pub type AnnounceOutChannel = Channel<ChannelMutex, Announcement, TRANSPORT_QUEUE_SIZE>;

/// Outbound unicast channel type: `(next_hop, packet)` pairs for the radio.
pub type DataOutChannel = Channel<ChannelMutex, (LinkAddr, DataPacket), TRANSPORT_QUEUE_SIZE>;

/// Protocol event channel.
pub type EventChannel = Channel<ChannelMutex, Event, EVENT_QUEUE_SIZE>;

/// Origination trigger channel (external stimulus, e.g. a button press).
pub type TriggerChannel = Channel<ChannelMutex, (), TRIGGER_QUEUE_SIZE>;

/// Transport trait for radio/network backends.
///
/// Three bounded channels connect the routing core to the link layer:
/// - `incoming()`: delivered announcements and data frames
/// - `announce_outgoing()`: gradient bumps for the broadcast primitive
/// - `data_outgoing()`: addressed unicast frames for the next hop
///
/// All queues are best-effort. `try_send` on a full queue drops the message
/// and the node counts the drop in its metrics; the protocol is built to
/// tolerate loss, so a full queue behaves like a lossy channel.
///
/// # Usage Pattern
///
/// - Radio ISR → `incoming().try_send(msg)` when a frame is received
/// - Simulator → `incoming().try_send(msg)` to deliver messages
/// - Radio TX task → `announce_outgoing().receive().await` /
///   `data_outgoing().receive().await` to drain outbound queues
pub trait Transport {
    /// Channel for messages received from the radio.
    fn incoming(&self) -> &TransportInChannel;

    /// Queue of outbound announcement bumps.
    fn announce_outgoing(&self) -> &AnnounceOutChannel;

    /// Queue of outbound unicast data frames.
    fn data_outgoing(&self) -> &DataOutChannel;
}

/// Time source trait for real or simulated time.
///
/// # Example (testing with MockClock)
///
/// ```ignore
/// use gradmesh::traits::test_impls::MockClock;
/// use gradmesh::{Clock, Duration, Timestamp};
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), Timestamp::ZERO);
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), Timestamp::from_secs(10));
/// ```
pub trait Clock {
    /// Future type returned by sleep_until.
    type SleepFuture<'a>: Future<Output = ()>
    where
        Self: 'a;

    /// Get the current timestamp.
    fn now(&self) -> Timestamp;

    /// Sleep until the given timestamp.
    ///
    /// For simulation, this should complete when the simulator advances
    /// time past the given timestamp.
    fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_>;
}

/// Random number generator trait.
///
/// Used for origination jitter.
pub trait Random {
    /// Generate a random u64 in the range [min, max).
    fn gen_range(&mut self, min: u64, max: u64) -> u64;
}

/// Sensor access trait.
///
/// Readings are plain integers, as the underlying drivers supply them.
pub trait Sensors {
    /// Current light reading.
    fn light(&mut self) -> i32;

    /// Current temperature reading in degrees.
    fn temperature(&mut self) -> i32;
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_impls {
    //! Mock implementations of traits for unit testing and simulation.
    //!
    //! Available when running tests or with the `test-support` feature.

    use core::cell::Cell;
    use core::future::{ready, Ready};

    use alloc::vec::Vec;

    use super::*;

    /// Mock transport backed by the three protocol channels.
    pub struct MockTransport {
        incoming: TransportInChannel,
        announce_outgoing: AnnounceOutChannel,
        data_outgoing: DataOutChannel,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self {
                incoming: Channel::new(),
                announce_outgoing: Channel::new(),
                data_outgoing: Channel::new(),
            }
        }
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Inject a message as if it was received from the radio.
        pub fn inject_rx(&self, msg: Inbound) {
            let _ = self.incoming.try_send(msg);
        }

        /// Take all queued announcement bumps.
        pub fn take_announcements(&self) -> Vec<Announcement> {
            let mut msgs = Vec::new();
            while let Ok(msg) = self.announce_outgoing.try_receive() {
                msgs.push(msg);
            }
            msgs
        }

        /// Take all queued unicast frames.
        pub fn take_data(&self) -> Vec<(LinkAddr, DataPacket)> {
            let mut msgs = Vec::new();
            while let Ok(msg) = self.data_outgoing.try_receive() {
                msgs.push(msg);
            }
            msgs
        }
    }

    impl Transport for MockTransport {
        fn incoming(&self) -> &TransportInChannel {
            &self.incoming
        }

        fn announce_outgoing(&self) -> &AnnounceOutChannel {
            &self.announce_outgoing
        }

        fn data_outgoing(&self) -> &DataOutChannel {
            &self.data_outgoing
        }
    }

    /// Mock clock for testing (synchronous, time advances manually).
    pub struct MockClock {
        current: Cell<Timestamp>,
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self {
                current: Cell::new(Timestamp::ZERO),
            }
        }
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn at(time: Timestamp) -> Self {
            Self {
                current: Cell::new(time),
            }
        }

        /// Advance time to the given timestamp.
        pub fn set(&self, time: Timestamp) {
            self.current.set(time);
        }

        /// Advance time by the given duration.
        pub fn advance(&self, duration: crate::time::Duration) {
            self.current.set(self.current.get() + duration);
        }
    }

    impl Clock for MockClock {
        type SleepFuture<'a> = Ready<()>;

        fn now(&self) -> Timestamp {
            self.current.get()
        }

        fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
            // In synchronous tests, sleep completes immediately.
            // The test code should advance time manually.
            ready(())
        }
    }

    /// Mock random for testing (deterministic LCG).
    pub struct MockRandom {
        pub state: u64,
    }

    impl Default for MockRandom {
        fn default() -> Self {
            Self { state: 12345 }
        }
    }

    impl MockRandom {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_seed(seed: u64) -> Self {
            Self { state: seed }
        }
    }

    impl Random for MockRandom {
        fn gen_range(&mut self, min: u64, max: u64) -> u64 {
            // Simple LCG
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let range = max - min;
            if range == 0 {
                return min;
            }
            min + (self.state % range)
        }
    }

    /// Mock sensors returning fixed values.
    pub struct MockSensors {
        pub light: i32,
        pub temperature: i32,
    }

    impl Default for MockSensors {
        fn default() -> Self {
            Self {
                light: 180,
                temperature: 25,
            }
        }
    }

    impl MockSensors {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_values(light: i32, temperature: i32) -> Self {
            Self { light, temperature }
        }
    }

    impl Sensors for MockSensors {
        fn light(&mut self) -> i32 {
            self.light
        }

        fn temperature(&mut self) -> i32 {
            self.temperature
        }
    }
}
