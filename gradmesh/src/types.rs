//! Core types and constants for the gradmesh protocol.

use core::fmt;

use alloc::vec::Vec;

use crate::wire::DataRecord;

/// Hop-count distance toward the sink, as carried in announcements.
pub type HopCount = u16;

/// Sentinel hop count: not connected to any path toward the sink.
pub const MAX_HOP_COUNT: HopCount = 9999;

/// Announcement channel shared by every node of a deployment. Announcements
/// heard on a different channel belong to another protocol and are ignored.
pub const CHANNEL: u16 = 135;

/// Default neighbor pool capacity. Entries beyond this are silently dropped.
pub const MAX_NEIGHBORS: usize = 16;

/// Payload type for multihop data packets.
pub type Payload = Vec<u8>;

/// Two-byte link-layer address, low byte first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LinkAddr(pub [u8; 2]);

impl LinkAddr {
    /// The sink's well-known address, `1.0`.
    pub const SINK: LinkAddr = LinkAddr([1, 0]);

    /// Create an address from its two bytes (low, high).
    pub const fn new(lo: u8, hi: u8) -> Self {
        LinkAddr([lo, hi])
    }

    /// Create an address from a small integer node id.
    pub const fn from_node_id(id: u16) -> Self {
        LinkAddr([id as u8, (id >> 8) as u8])
    }

    /// The small integer node id used in wire records: `lo + hi * 256`.
    pub const fn node_id(self) -> u16 {
        self.0[0] as u16 + self.0[1] as u16 * 256
    }
}

impl fmt::Debug for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Dotted byte notation, e.g. "1.0"
        write!(f, "{}.{}", self.0[0], self.0[1])
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0[0], self.0[1])
    }
}

/// A gossip message carrying a node's current gradient value.
///
/// Delivery is unreliable broadcast to one-hop neighbors. The same struct is
/// used on both sides: outbound bumps queue it, inbound handling consumes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Announcement {
    /// Protocol channel identifier (see [`CHANNEL`]).
    pub channel: u16,
    /// Link-layer address of the announcing node.
    pub from: LinkAddr,
    /// The announcer's hop count to the sink.
    pub value: HopCount,
}

/// A multihop data packet in flight.
///
/// The link-layer sender of the current frame is reception metadata and
/// travels beside the packet, not inside it - see [`Inbound::Data`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataPacket {
    /// The node that originated the packet.
    pub originator: LinkAddr,
    /// Final destination address.
    pub dest: LinkAddr,
    /// Number of relay hops taken so far.
    pub hops: u8,
    /// Opaque payload (an ASCII data record, see [`crate::wire`]).
    pub payload: Payload,
}

/// Messages delivered by the transport to the routing core.
#[derive(Clone, Debug)]
pub enum Inbound {
    /// An announcement heard from a one-hop neighbor.
    Announcement(Announcement),
    /// A data packet addressed to this node or awaiting relay.
    Data {
        /// Link-layer sender of this frame (the previous hop).
        prev_hop: LinkAddr,
        packet: DataPacket,
    },
}

/// Events emitted by the node for application handling.
#[derive(Clone, Debug)]
pub enum Event {
    /// A data record reached its destination (normally the sink).
    RecordReceived {
        /// Originator of the record.
        from: LinkAddr,
        record: DataRecord,
        /// Relay hops the packet took.
        hops: u8,
    },
    /// The local hop-count estimate changed.
    HopCountChanged { old: HopCount, new: HopCount },
}

/// Counters for monitoring protocol activity.
///
/// Every drop in the core is silent by design; these counters are the only
/// place losses are visible.
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub announcements_sent: u32,
    pub announcements_dropped: u32,
    pub announcements_received: u32,
    pub records_originated: u32,
    pub packets_forwarded: u32,
    pub packets_dropped: u32,
    pub records_delivered: u32,
    pub records_malformed: u32,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_addr_node_id() {
        assert_eq!(LinkAddr::new(1, 0).node_id(), 1);
        assert_eq!(LinkAddr::new(0, 1).node_id(), 256);
        assert_eq!(LinkAddr::new(42, 2).node_id(), 42 + 2 * 256);
    }

    #[test]
    fn test_link_addr_from_node_id_roundtrip() {
        for id in [0u16, 1, 42, 255, 256, 513, u16::MAX] {
            assert_eq!(LinkAddr::from_node_id(id).node_id(), id);
        }
    }

    #[test]
    fn test_sink_addr() {
        assert_eq!(LinkAddr::SINK, LinkAddr::new(1, 0));
        assert_eq!(LinkAddr::SINK.node_id(), 1);
    }
}
