//! Metrics collection for simulation analysis.

use gradmesh::{HopCount, LinkAddr, Timestamp};
use hashbrown::HashMap;

/// A snapshot of every node's gradient estimate at a point in time.
#[derive(Debug, Clone)]
pub struct GradientSnapshot {
    /// When this snapshot was taken.
    pub time: Timestamp,
    /// Hop-count estimate per node (0 for the sink).
    pub hop_counts: HashMap<LinkAddr, HopCount>,
}

impl GradientSnapshot {
    /// Create a new empty snapshot.
    pub fn new(time: Timestamp) -> Self {
        Self {
            time,
            hop_counts: HashMap::new(),
        }
    }

    /// Record a node's state.
    pub fn record_node(&mut self, addr: LinkAddr, hop_count: HopCount) {
        self.hop_counts.insert(addr, hop_count);
    }

    /// A node's recorded estimate.
    pub fn hop_count(&self, addr: LinkAddr) -> Option<HopCount> {
        self.hop_counts.get(&addr).copied()
    }

    /// True when every recorded node matches the expected distance map
    /// exactly (the BFS fixed point from [`crate::Topology::hop_distances`]).
    pub fn matches(&self, expected: &HashMap<LinkAddr, u16>) -> bool {
        self.hop_counts
            .iter()
            .all(|(addr, &hop)| expected.get(addr) == Some(&hop))
    }
}

/// Simulation metrics collected over time.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// Announcement bumps put on the air (one per broadcast, not per
    /// receiver).
    pub announcements_sent: u64,
    /// Unicast data frames put on the air.
    pub packets_sent: u64,
    /// Deliveries suppressed by loss rate or a dead link.
    pub messages_dropped: u64,
    /// Messages delivered successfully.
    pub messages_delivered: u64,
    /// Gradient snapshots taken at intervals.
    pub snapshots: Vec<GradientSnapshot>,
}

impl SimMetrics {
    /// Create new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot.
    pub fn add_snapshot(&mut self, snapshot: GradientSnapshot) {
        self.snapshots.push(snapshot);
    }

    /// First time the network matched the expected distances.
    pub fn convergence_time(&self, expected: &HashMap<LinkAddr, u16>) -> Option<Timestamp> {
        self.snapshots
            .iter()
            .find(|s| s.matches(expected))
            .map(|s| s.time)
    }

    /// Get the latest snapshot.
    pub fn latest_snapshot(&self) -> Option<&GradientSnapshot> {
        self.snapshots.last()
    }
}

/// Result of running a simulation.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Final simulation time.
    pub end_time: Timestamp,
    /// Collected metrics.
    pub metrics: SimMetrics,
}

impl SimulationResult {
    /// Check whether the final snapshot matches the expected distances.
    pub fn converged_to(&self, expected: &HashMap<LinkAddr, u16>) -> bool {
        self.metrics
            .latest_snapshot()
            .is_some_and(|s| s.matches(expected))
    }

    /// A node's estimate in the final snapshot.
    pub fn final_hop_count(&self, addr: LinkAddr) -> Option<HopCount> {
        self.metrics.latest_snapshot().and_then(|s| s.hop_count(addr))
    }
}
