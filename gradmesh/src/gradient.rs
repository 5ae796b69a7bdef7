//! Gradient maintenance: announcement handling and hop-count relaxation.
//!
//! Each node keeps a local estimate of its hop distance to the sink, built
//! only from neighbors' self-reported distances - a localized Bellman-Ford
//! relaxation re-run on every topology-relevant event (neighbor added,
//! updated, or removed).
//!
//! Update rule: **full relaxation**. The estimate re-converges to
//! `min(neighbors) + 1` on any change, up or down. A node never regresses to
//! the unreachable sentinel just because its neighbor list emptied; it only
//! moves when a concrete value is known.

use crate::debug::DebugEvent;
use crate::neighbors::Upsert;
use crate::node::{Node, Role};
use crate::time::Timestamp;
use crate::traits::{Clock, Random, Sensors, Transport};
use crate::types::{Announcement, Event, HopCount, MAX_HOP_COUNT};

/// Per-node routing state: the hop-count estimate and the value last
/// published on the announcement channel, kept in sync whenever the
/// estimate changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalRoutingState {
    /// Current hop-count estimate toward the sink.
    pub hop_count: HopCount,
    /// The value last published via the announcement channel.
    pub announced: HopCount,
}

impl LocalRoutingState {
    /// Not yet connected to any path toward the sink.
    pub const fn unreachable() -> Self {
        Self {
            hop_count: MAX_HOP_COUNT,
            announced: MAX_HOP_COUNT,
        }
    }

    /// The sink's fixed state: distance zero, never recomputed.
    pub const fn sink() -> Self {
        Self {
            hop_count: 0,
            announced: 0,
        }
    }
}

impl<T, R, Clk, S> Node<T, R, Clk, S>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    S: Sensors,
{
    /// Handle a received announcement.
    ///
    /// The table is updated before recomputation, so a just-improved
    /// neighbor is immediately eligible to set the new minimum.
    pub(crate) fn handle_announcement(&mut self, ann: Announcement, now: Timestamp) {
        // Announcements on another channel belong to a different protocol.
        if ann.channel != self.config.channel {
            return;
        }
        // Broadcast loopback guard.
        if ann.from == self.addr {
            return;
        }

        self.metrics.announcements_received += 1;
        emit_debug!(
            self,
            DebugEvent::AnnouncementReceived {
                timestamp: now,
                from: ann.from,
                value: ann.value,
            }
        );

        // The sink keeps no neighbor table and never recomputes.
        if self.role == Role::Sink {
            return;
        }

        let deadline = now + self.config.neighbor_timeout;
        if let Upsert::Dropped = self.table.upsert(ann.from, ann.value, deadline) {
            // Pool exhausted: the neighbor is not tracked, nothing else to do.
            emit_debug!(self, DebugEvent::NeighborTableFull { addr: ann.from });
            return;
        }

        self.recompute_gradient(now);
    }

    /// Re-derive the hop-count estimate from the neighbor table.
    ///
    /// On change: synchronize the announced value and broadcast an immediate
    /// out-of-band bump, ahead of the next periodic one, so topology changes
    /// propagate promptly.
    pub(crate) fn recompute_gradient(&mut self, now: Timestamp) {
        if self.role == Role::Sink {
            return;
        }

        let min = match self.table.min_hop_count() {
            Some(min) => min,
            // No live neighbors: the estimate is left unchanged.
            None => return,
        };
        if min == MAX_HOP_COUNT {
            // Every neighbor is itself unreachable; no usable path is known.
            return;
        }

        let candidate = min.saturating_add(1).min(MAX_HOP_COUNT);
        if candidate == self.state.hop_count {
            return;
        }

        let old = self.state.hop_count;
        self.state.hop_count = candidate;
        self.state.announced = candidate;

        emit_debug!(
            self,
            DebugEvent::HopCountChanged {
                timestamp: now,
                old,
                new: candidate,
            }
        );
        self.push_event(Event::HopCountChanged {
            old,
            new: candidate,
        });

        // Event-triggered bump.
        self.send_announcement(now);
    }

    /// Broadcast the current announced value.
    ///
    /// Used for both the periodic bump and the event-triggered one. A full
    /// outbound queue drops the bump; the periodic schedule heals the loss.
    pub(crate) fn send_announcement(&mut self, now: Timestamp) {
        let ann = Announcement {
            channel: self.config.channel,
            from: self.addr,
            value: self.state.announced,
        };
        match self.transport.announce_outgoing().try_send(ann) {
            Ok(()) => self.metrics.announcements_sent += 1,
            Err(_) => self.metrics.announcements_dropped += 1,
        }
        self.last_announce = Some(now);
        emit_debug!(
            self,
            DebugEvent::AnnouncementSent {
                timestamp: now,
                value: ann.value,
            }
        );
    }
}
