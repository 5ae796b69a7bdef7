//! Event types and priority queue for discrete event simulation.

use std::cmp::Ordering;

use gradmesh::{Announcement, DataPacket, LinkAddr, Timestamp};

/// Unique sequence number for deterministic event ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Scenario actions that can be scheduled during simulation.
#[derive(Debug, Clone)]
pub enum ScenarioAction {
    /// Partition the network into isolated groups.
    Partition { groups: Vec<Vec<LinkAddr>> },
    /// Heal all partitions (restore full connectivity).
    HealPartition,
    /// Disable a specific link.
    DisableLink { from: LinkAddr, to: LinkAddr },
    /// Enable a specific link.
    EnableLink { from: LinkAddr, to: LinkAddr },
    /// Set loss rate on a link.
    SetLossRate {
        from: LinkAddr,
        to: LinkAddr,
        rate: f64,
    },
    /// Take a gradient snapshot for metrics.
    TakeSnapshot,
}

/// Events in the discrete event simulation.
#[derive(Debug, Clone)]
pub enum Event {
    /// Deliver a broadcast announcement to a node.
    AnnouncementDelivery { to: LinkAddr, ann: Announcement },
    /// Deliver a unicast data frame to a node.
    PacketDelivery {
        to: LinkAddr,
        prev_hop: LinkAddr,
        packet: DataPacket,
    },
    /// Fire the timer for a node.
    TimerFire { node: LinkAddr },
    /// External stimulus: force a node to originate immediately.
    Originate { node: LinkAddr },
    /// Execute a scenario action.
    ScenarioAction(ScenarioAction),
}

/// A scheduled event with timestamp and sequence number for ordering.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// When the event should occur.
    pub time: Timestamp,
    /// Sequence number for deterministic ordering of same-time events.
    pub seq: SequenceNumber,
    /// The event to process.
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time: Timestamp, seq: SequenceNumber, event: Event) -> Self {
        Self { time, seq, event }
    }
}

// Implement ordering for min-heap (BinaryHeap is max-heap, so we reverse).
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap).
        // First compare by time, then by sequence number.
        match other.time.as_millis().cmp(&self.time.as_millis()) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(node_id: u16) -> Event {
        Event::TimerFire {
            node: LinkAddr::from_node_id(node_id),
        }
    }

    #[test]
    fn test_event_ordering() {
        let e1 = ScheduledEvent::new(Timestamp::from_secs(10), SequenceNumber::new(1), timer(2));
        let e2 = ScheduledEvent::new(Timestamp::from_secs(5), SequenceNumber::new(2), timer(2));

        // e2 has earlier time, so it should be "greater" in min-heap terms
        assert!(e2 > e1);
    }

    #[test]
    fn test_same_time_sequence_ordering() {
        let e1 = ScheduledEvent::new(Timestamp::from_secs(10), SequenceNumber::new(1), timer(2));
        let e2 = ScheduledEvent::new(Timestamp::from_secs(10), SequenceNumber::new(2), timer(2));

        // Same time, e1 has lower sequence, so e1 should be processed first
        assert!(e1 > e2);
    }

    #[test]
    fn test_heap_pops_earliest_first() {
        let mut heap = std::collections::BinaryHeap::new();
        heap.push(ScheduledEvent::new(
            Timestamp::from_secs(20),
            SequenceNumber::new(0),
            timer(2),
        ));
        heap.push(ScheduledEvent::new(
            Timestamp::from_secs(5),
            SequenceNumber::new(1),
            timer(3),
        ));
        heap.push(ScheduledEvent::new(
            Timestamp::from_secs(10),
            SequenceNumber::new(2),
            timer(4),
        ));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop())
            .map(|e| e.time.as_secs())
            .collect();
        assert_eq!(order, vec![5, 10, 20]);
    }
}
