//! SimNode wrapper for simulated gradmesh nodes.
//!
//! The wrapper owns a gradmesh `Node` wired to the crate's mock transport,
//! clock, and random implementations, plus deterministic per-node sensors.
//! Handlers set the mock clock before delegating, so any code that reads
//! `clock.now()` observes simulation time.

use gradmesh::debug::DebugEvent;
use gradmesh::traits::test_impls::{MockClock, MockRandom, MockSensors, MockTransport};
use gradmesh::{
    Announcement, Config, DataPacket, Event, HopCount, Inbound, LinkAddr, Metrics, Node, Timestamp,
};

/// Deterministic per-node sensor values, derived from the node id so
/// records are distinguishable in end-to-end tests.
pub fn sim_sensors(addr: LinkAddr) -> MockSensors {
    let id = addr.node_id() as i32;
    MockSensors::with_values(100 + id, 20 + id % 10)
}

/// Type alias for simulated nodes.
pub type SimNodeInner = Node<MockTransport, MockRandom, MockClock, MockSensors>;

/// Wrapper around a gradmesh Node for simulation.
pub struct SimNode {
    /// The underlying gradmesh node.
    inner: SimNodeInner,
    /// When the node was created.
    pub created_at: Timestamp,
}

impl SimNode {
    /// Create a sensor node with a deterministic identity and jitter seed.
    pub fn sensor(addr: LinkAddr, seed: u64, created_at: Timestamp, config: Config) -> Self {
        let inner = Node::new(
            MockTransport::new(),
            MockRandom::with_seed(seed),
            MockClock::at(created_at),
            sim_sensors(addr),
            addr,
            config,
        );
        Self { inner, created_at }
    }

    /// Create the sink node.
    pub fn sink(seed: u64, created_at: Timestamp, config: Config) -> Self {
        let inner = Node::sink(
            MockTransport::new(),
            MockRandom::with_seed(seed),
            MockClock::at(created_at),
            MockSensors::new(),
            config,
        );
        Self { inner, created_at }
    }

    /// Get the node's link address.
    pub fn addr(&self) -> LinkAddr {
        self.inner.addr()
    }

    /// True for the sink node.
    pub fn is_sink(&self) -> bool {
        self.inner.is_sink()
    }

    /// Current hop-count estimate.
    pub fn hop_count(&self) -> HopCount {
        self.inner.hop_count()
    }

    /// The value last published on the announcement channel.
    pub fn announced_value(&self) -> HopCount {
        self.inner.announced_value()
    }

    /// Number of tracked neighbors.
    pub fn neighbor_count(&self) -> usize {
        self.inner.neighbor_count()
    }

    /// Protocol activity counters.
    pub fn metrics(&self) -> &Metrics {
        self.inner.metrics()
    }

    /// Get a reference to the inner node.
    pub fn inner(&self) -> &SimNodeInner {
        &self.inner
    }

    /// Get a mutable reference to the inner node.
    pub fn inner_mut(&mut self) -> &mut SimNodeInner {
        &mut self.inner
    }

    /// Deliver a broadcast announcement.
    pub fn handle_announcement(&mut self, ann: Announcement, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_inbound(Inbound::Announcement(ann), now);
    }

    /// Deliver a unicast data frame.
    pub fn handle_packet(&mut self, prev_hop: LinkAddr, packet: DataPacket, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_inbound(Inbound::Data { prev_hop, packet }, now);
    }

    /// Fire timer work.
    pub fn handle_timer(&mut self, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_timer(now);
    }

    /// Force an immediate origination (external stimulus).
    pub fn handle_trigger(&mut self, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_trigger(now);
    }

    /// Take all queued outbound traffic: `(announcements, unicasts)`.
    pub fn take_outgoing(&self) -> (Vec<Announcement>, Vec<(LinkAddr, DataPacket)>) {
        (
            self.inner.transport().take_announcements(),
            self.inner.transport().take_data(),
        )
    }

    /// Take all pending application events.
    pub fn take_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.events().try_receive() {
            events.push(event);
        }
        events
    }

    /// Take all debug events from the node's trace channel.
    pub fn take_debug_events(&self) -> Vec<DebugEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.debug_channel().try_receive() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradmesh::{Clock, Duration, MAX_HOP_COUNT};

    #[test]
    fn test_simnode_sensor_creation() {
        let node = SimNode::sensor(
            LinkAddr::from_node_id(2),
            42,
            Timestamp::ZERO,
            Config::default(),
        );
        assert!(!node.is_sink());
        assert_eq!(node.hop_count(), MAX_HOP_COUNT);
        assert_eq!(node.neighbor_count(), 0);
    }

    #[test]
    fn test_simnode_sink_creation() {
        let node = SimNode::sink(42, Timestamp::ZERO, Config::default());
        assert!(node.is_sink());
        assert_eq!(node.addr(), LinkAddr::SINK);
        assert_eq!(node.hop_count(), 0);
    }

    #[test]
    fn test_initialize_queues_announcement() {
        let mut node = SimNode::sink(42, Timestamp::ZERO, Config::default());
        node.inner_mut().initialize(Timestamp::ZERO);

        let (announcements, unicasts) = node.take_outgoing();
        assert_eq!(announcements.len(), 1);
        assert_eq!(announcements[0].value, 0);
        assert!(unicasts.is_empty());
    }

    #[test]
    fn test_handlers_update_clock() {
        let mut node = SimNode::sensor(
            LinkAddr::from_node_id(2),
            42,
            Timestamp::ZERO,
            Config::default(),
        );
        node.handle_timer(Timestamp::from_secs(5));
        assert_eq!(node.inner().clock().now(), Timestamp::from_secs(5));

        node.handle_timer(Timestamp::from_secs(5) + Duration::from_millis(250));
        assert_eq!(
            node.inner().clock().now().as_millis(),
            5250
        );
    }

    #[test]
    fn test_sim_sensors_distinct_per_node() {
        let a = sim_sensors(LinkAddr::from_node_id(2));
        let b = sim_sensors(LinkAddr::from_node_id(3));
        assert_ne!(a.light, b.light);
    }
}
