//! Multihop forwarding: the per-hop next-hop decision and relay handling.
//!
//! Forwarding is a greedy single pass over the neighbor table, no sorting:
//! a neighbor that IS the destination wins outright; otherwise the neighbor
//! with the strictly smallest hop count wins, first-seen breaking ties.
//! Packets with no eligible next hop are dropped - there is no queuing,
//! buffering, or retry at this layer.

use crate::debug::DebugEvent;
use crate::node::{Node, Role};
use crate::time::Timestamp;
use crate::traits::{Clock, Random, Sensors, Transport};
use crate::types::{DataPacket, LinkAddr, MAX_HOP_COUNT};

impl<T, R, Clk, S> Node<T, R, Clk, S>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    S: Sensors,
{
    /// Handle an inbound data packet: deliver locally or relay.
    pub(crate) fn handle_data(&mut self, prev_hop: LinkAddr, packet: DataPacket, now: Timestamp) {
        let _ = now;

        if packet.dest == self.addr {
            self.deliver_record(prev_hop, packet);
            return;
        }

        if self.role == Role::Sink {
            // The sink is a destination, never a relay.
            self.metrics.packets_dropped += 1;
            emit_debug!(
                self,
                DebugEvent::PacketDropped {
                    dest: packet.dest,
                    reason: "sink does not forward",
                }
            );
            return;
        }

        match self.select_next_hop(packet.originator, packet.dest, prev_hop) {
            Some(next_hop) => self.forward_packet(next_hop, packet),
            None => {
                self.metrics.packets_dropped += 1;
                emit_debug!(
                    self,
                    DebugEvent::PacketDropped {
                        dest: packet.dest,
                        reason: "no forwarding candidate",
                    }
                );
            }
        }
    }

    /// Pick the next hop for a packet, or `None` to drop it.
    ///
    /// Single pass over the table in insertion order:
    /// 1. A neighbor whose address equals `dest` is selected immediately -
    ///    direct delivery takes absolute priority over gradient relaying.
    /// 2. Otherwise, neighbors matching `originator` or `prev_hop` are
    ///    skipped (loop and back-forwarding suppression) and the strictly
    ///    smallest hop count wins; first seen wins ties. Neighbors at the
    ///    unreachable sentinel are never candidates.
    ///
    /// Read-only: invoked once per packet requiring relay, mutates nothing.
    pub fn select_next_hop(
        &self,
        originator: LinkAddr,
        dest: LinkAddr,
        prev_hop: LinkAddr,
    ) -> Option<LinkAddr> {
        let mut best: Option<LinkAddr> = None;
        let mut best_hop_count = MAX_HOP_COUNT;

        for entry in self.table.iter() {
            if entry.addr == dest {
                return Some(entry.addr);
            }
            if entry.addr == originator || entry.addr == prev_hop {
                continue;
            }
            if entry.hop_count_to_sink < best_hop_count {
                best = Some(entry.addr);
                best_hop_count = entry.hop_count_to_sink;
            }
        }

        best
    }

    /// Transmit a packet to the chosen next hop, counting the hop.
    pub(crate) fn forward_packet(&mut self, next_hop: LinkAddr, mut packet: DataPacket) {
        packet.hops = packet.hops.saturating_add(1);
        let dest = packet.dest;
        let hops = packet.hops;

        match self.transport.data_outgoing().try_send((next_hop, packet)) {
            Ok(()) => {
                self.metrics.packets_forwarded += 1;
                emit_debug!(
                    self,
                    DebugEvent::PacketForwarded {
                        dest,
                        next_hop,
                        hops,
                    }
                );
            }
            Err(_) => {
                self.metrics.packets_dropped += 1;
                emit_debug!(
                    self,
                    DebugEvent::PacketDropped {
                        dest,
                        reason: "outbound queue full",
                    }
                );
            }
        }
    }
}
