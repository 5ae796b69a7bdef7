//! Debug events for protocol tracing.
//!
//! Every node carries a bounded debug channel; events are pushed best-effort
//! (a full channel drops the event, never blocks a handler). Simulation and
//! test harnesses drain the channel to trace protocol flow.

use embassy_sync::channel::Channel;

use crate::time::Timestamp;
use crate::traits::ChannelMutex;
use crate::types::{HopCount, LinkAddr};
use crate::wire::DecodeError;

/// Queue size for the debug channel.
pub const DEBUG_QUEUE_SIZE: usize = 32;

/// Debug event channel type.
pub type DebugChannel = Channel<ChannelMutex, DebugEvent, DEBUG_QUEUE_SIZE>;

/// Debug events emitted by the node for protocol tracing.
#[derive(Clone, Debug)]
pub enum DebugEvent {
    /// Announcement heard from a neighbor.
    AnnouncementReceived {
        timestamp: Timestamp,
        from: LinkAddr,
        value: HopCount,
    },
    /// Announcement bump queued for broadcast.
    AnnouncementSent {
        timestamp: Timestamp,
        value: HopCount,
    },
    /// The gradient estimate changed.
    HopCountChanged {
        timestamp: Timestamp,
        old: HopCount,
        new: HopCount,
    },
    /// A neighbor's liveness deadline passed.
    NeighborExpired { timestamp: Timestamp, addr: LinkAddr },
    /// Neighbor pool full; a new neighbor is not tracked.
    NeighborTableFull { addr: LinkAddr },
    /// Packet relayed toward the sink.
    PacketForwarded {
        dest: LinkAddr,
        next_hop: LinkAddr,
        hops: u8,
    },
    /// Packet dropped (no forwarding candidate, or queue full).
    PacketDropped { dest: LinkAddr, reason: &'static str },
    /// A sensor record was originated locally.
    RecordOriginated { timestamp: Timestamp, node_id: u16 },
    /// A record reached this node as its destination.
    RecordDelivered { from: LinkAddr, hops: u8 },
    /// A received payload failed to decode.
    RecordRejected { error: DecodeError },
}

/// Push a debug event onto a node's channel, dropping it when full.
macro_rules! emit_debug {
    ($node:expr, $event:expr) => {
        let _ = $node.debug_channel().try_send($event);
    };
}
