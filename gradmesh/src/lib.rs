#![forbid(unsafe_code)]
//! gradmesh - Gradient-based multihop routing for wireless sensor meshes.
//!
//! A routing layer for battery-powered nodes that relay periodic sensor
//! readings toward one designated sink over an unreliable, lossy, multihop
//! radio mesh with no fixed topology. Nodes keep only local state: a bounded
//! table of one-hop neighbors and a scalar hop-count estimate, maintained by
//! periodic gossip.
//!
//! This crate is `no_std` but **requires the `alloc` crate**: packet
//! payloads and the neighbor arena are heap-allocated with fixed,
//! runtime-enforced capacity limits.
//!
//! # Key Properties
//!
//! - Hop-count gradient toward the sink, propagated by local announcements
//! - Per-hop greedy forwarding with loop suppression, no routing tables
//!   beyond one hop
//! - Bounded neighbor pool (default 16) with per-entry liveness deadlines
//! - Self-healing: an unconditional periodic re-broadcast recovers from any
//!   lost announcement
//! - No clock synchronization required; all time is local
//!
//! # Example (basic usage)
//!
//! ```ignore
//! use gradmesh::{Config, LinkAddr, Node};
//!
//! // Implement Transport, Random, Clock and Sensors for your platform...
//! let mut node = Node::new(transport, random, clock, sensors,
//!                          LinkAddr::new(2, 0), Config::default());
//!
//! // Spawn the node's run loop
//! spawn(async move {
//!     node.run().await;
//! });
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Core types (LinkAddr, Announcement, DataPacket, etc.)
//! - [`time`] - Timestamp and Duration types
//! - [`config`] - Runtime protocol configuration
//! - [`traits`] - Transport, Clock, Random, Sensors traits
//! - [`neighbors`] - Bounded neighbor table
//! - [`gradient`] - Announcement handling and hop-count relaxation
//! - [`routing`] - The per-hop forwarding decision
//! - [`data`] - Record origination and sink-side delivery
//! - [`wire`] - ASCII record wire format and sink rendering
//! - [`node`] - Main Node struct and public API
//! - [`debug`] - Protocol trace events

#![no_std]

extern crate alloc;

#[macro_use]
pub mod debug;

pub mod config;
pub mod data;
pub mod gradient;
pub mod neighbors;
pub mod node;
pub mod routing;
pub mod time;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use config::Config;
pub use gradient::LocalRoutingState;
pub use neighbors::{NeighborEntry, NeighborId, NeighborTable, Upsert};
pub use node::{Node, Role};
pub use time::{Duration, Timestamp};
pub use traits::{Clock, Random, Sensors, Transport};
pub use types::{
    Announcement, DataPacket, Event, HopCount, Inbound, LinkAddr, Metrics, Payload, CHANNEL,
    MAX_HOP_COUNT, MAX_NEIGHBORS,
};
pub use wire::{render_rows, DataRecord, DecodeError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::test_impls::{MockClock, MockRandom, MockSensors, MockTransport};

    /// Type alias for test nodes.
    type TestNode = Node<MockTransport, MockRandom, MockClock, MockSensors>;

    fn sensor(id: u16, light: i32, temperature: i32) -> TestNode {
        Node::new(
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
            MockSensors::with_values(light, temperature),
            LinkAddr::from_node_id(id),
            Config::default(),
        )
    }

    fn sink() -> TestNode {
        Node::sink(
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
            MockSensors::new(),
            Config::default(),
        )
    }

    /// Shuttle one node's queued announcements into another node.
    fn gossip(from: &mut TestNode, to: &mut TestNode, now: Timestamp) {
        for ann in from.transport().take_announcements() {
            to.handle_inbound(Inbound::Announcement(ann), now);
        }
    }

    #[test]
    fn test_one_hop_delivery_to_sink() {
        let mut sink = sink();
        let mut sensor = sensor(42, 180, 25);
        let now = Timestamp::ZERO;

        // The sink's first announcement teaches the sensor its distance
        sink.initialize(now);
        gossip(&mut sink, &mut sensor, now);
        assert_eq!(sensor.hop_count(), 1);

        // Stimulus-triggered origination goes straight to the sink
        sensor.handle_trigger(Timestamp::from_secs(1));
        let sent = sensor.transport().take_data();
        assert_eq!(sent.len(), 1);
        let (next_hop, packet) = sent.into_iter().next().unwrap();
        assert_eq!(next_hop, LinkAddr::SINK);

        sink.handle_inbound(
            Inbound::Data {
                prev_hop: sensor.addr(),
                packet,
            },
            Timestamp::from_secs(1),
        );

        match sink.events().try_receive() {
            Ok(Event::RecordReceived { from, record, hops }) => {
                assert_eq!(from, LinkAddr::from_node_id(42));
                assert_eq!(record.node_id, 42);
                assert_eq!(record.light, 180);
                assert_eq!(record.temperature, Some(25));
                assert_eq!(hops, 1);
                assert_eq!(
                    render_rows(&record),
                    "nodeID     light      temperature\n42         180        25        \n"
                );
            }
            other => panic!("expected RecordReceived, got {:?}", other),
        }
    }

    #[test]
    fn test_two_hop_relay_through_gradient() {
        // sink - a - b: b never hears the sink directly
        let mut sink = sink();
        let mut a = sensor(2, 100, 20);
        let mut b = sensor(3, 200, 21);
        let now = Timestamp::ZERO;

        sink.initialize(now);
        gossip(&mut sink, &mut a, now);
        assert_eq!(a.hop_count(), 1);

        // a's event bump reaches b
        gossip(&mut a, &mut b, now);
        assert_eq!(b.hop_count(), 2);

        // b originates: the only route is through a
        b.handle_trigger(Timestamp::from_secs(1));
        let (next_hop, packet) = b.transport().take_data().into_iter().next().unwrap();
        assert_eq!(next_hop, a.addr());

        // a relays directly to the sink (direct delivery priority)
        a.handle_inbound(
            Inbound::Data {
                prev_hop: b.addr(),
                packet,
            },
            Timestamp::from_secs(1),
        );
        let (next_hop, packet) = a.transport().take_data().into_iter().next().unwrap();
        assert_eq!(next_hop, LinkAddr::SINK);
        assert_eq!(packet.hops, 2);

        sink.handle_inbound(
            Inbound::Data {
                prev_hop: a.addr(),
                packet,
            },
            Timestamp::from_secs(1),
        );
        match sink.events().try_receive() {
            Ok(Event::RecordReceived { from, record, hops }) => {
                assert_eq!(from, LinkAddr::from_node_id(3));
                assert_eq!(record.light, 200);
                assert_eq!(hops, 2);
            }
            other => panic!("expected RecordReceived, got {:?}", other),
        }
    }

    #[test]
    fn test_periodic_bump_heals_a_missed_announcement() {
        // The sensor misses the sink's first announcement entirely; the
        // periodic bump 30 seconds later still teaches it the gradient.
        let mut sink = sink();
        let mut sensor = sensor(42, 180, 25);

        sink.initialize(Timestamp::ZERO);
        sink.transport().take_announcements(); // lost on the air

        sink.handle_timer(Timestamp::from_secs(30));
        gossip(&mut sink, &mut sensor, Timestamp::from_secs(30));
        assert_eq!(sensor.hop_count(), 1);
    }
}
