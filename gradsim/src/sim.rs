//! Discrete event simulator for gradmesh networks.
//!
//! The main loop pops events ordered by `(time, sequence)`, advances
//! simulation time, calls the target node's handlers directly, and routes
//! whatever traffic the handler queued: announcements fan out to every
//! active neighbor (with per-link loss and delay), unicast frames travel to
//! their addressed next hop only.

use std::collections::BinaryHeap;

use gradmesh::{Announcement, Config, DataPacket, Duration, LinkAddr, Timestamp};
use hashbrown::HashMap;

use crate::event::{Event, ScenarioAction, ScheduledEvent, SequenceNumber};
use crate::metrics::{GradientSnapshot, SimMetrics, SimulationResult};
use crate::node::SimNode;
use crate::topology::Topology;

/// Timer resolution: how often each node's timer work is serviced.
const TIMER_TICK: Duration = Duration::from_secs(1);

/// Discrete event simulator for gradmesh networks.
pub struct Simulator {
    /// All nodes in the simulation.
    nodes: HashMap<LinkAddr, SimNode>,
    /// Network topology.
    topology: Topology,
    /// Current simulation time.
    current_time: Timestamp,
    /// Priority queue of scheduled events.
    event_queue: BinaryHeap<ScheduledEvent>,
    /// Collected metrics.
    metrics: SimMetrics,
    /// Next sequence number for event ordering.
    next_seq: u64,
    /// Base seed for per-node randomness.
    base_seed: u64,
    /// RNG state for packet loss.
    rng_state: u64,
    /// Node configuration applied to added nodes.
    node_config: Config,
    /// Interval for automatic snapshots.
    snapshot_interval: Option<Duration>,
    /// Next snapshot time.
    next_snapshot: Option<Timestamp>,
}

impl Simulator {
    /// Create a new simulator with given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            topology: Topology::new(),
            current_time: Timestamp::ZERO,
            event_queue: BinaryHeap::new(),
            metrics: SimMetrics::new(),
            next_seq: 0,
            base_seed: seed,
            rng_state: seed,
            node_config: Config::default(),
            snapshot_interval: None,
            next_snapshot: None,
        }
    }

    /// Set the network topology. Must be done before adding nodes.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the protocol configuration used for nodes added afterwards.
    pub fn with_node_config(mut self, config: Config) -> Self {
        self.node_config = config;
        self
    }

    /// Set the snapshot interval for automatic gradient recording.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self.next_snapshot = Some(self.current_time + interval);
        self
    }

    /// Add a sensor node at the given address.
    pub fn add_sensor(&mut self, addr: LinkAddr) -> LinkAddr {
        let seed = self.node_seed(addr);
        let node = SimNode::sensor(addr, seed, self.current_time, self.node_config.clone());
        self.add_node_internal(node)
    }

    /// Add the sink node at the well-known sink address.
    pub fn add_sink(&mut self) -> LinkAddr {
        let seed = self.node_seed(LinkAddr::SINK);
        let node = SimNode::sink(seed, self.current_time, self.node_config.clone());
        self.add_node_internal(node)
    }

    fn node_seed(&self, addr: LinkAddr) -> u64 {
        self.base_seed.wrapping_add(addr.node_id() as u64 * 1000)
    }

    /// Internal helper to initialize and register a node.
    fn add_node_internal(&mut self, mut node: SimNode) -> LinkAddr {
        let addr = node.addr();

        // Initialize the node (queues its first announcement)
        node.inner_mut().initialize(self.current_time);
        self.nodes.insert(addr, node);

        // Route the initial announcement
        self.collect_outgoing(addr);

        // Service this node's timers at the tick resolution
        self.schedule_timer(addr, self.current_time + TIMER_TICK);

        addr
    }

    /// Get a reference to a node.
    pub fn node(&self, addr: &LinkAddr) -> Option<&SimNode> {
        self.nodes.get(addr)
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, addr: &LinkAddr) -> Option<&mut SimNode> {
        self.nodes.get_mut(addr)
    }

    /// Get all node addresses.
    pub fn node_addrs(&self) -> Vec<LinkAddr> {
        self.nodes.keys().copied().collect()
    }

    /// Get the current simulation time.
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Get the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get mutable topology.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Get collected metrics.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Schedule an event.
    pub fn schedule(&mut self, time: Timestamp, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    /// Schedule a timer event for a node.
    fn schedule_timer(&mut self, node: LinkAddr, time: Timestamp) {
        self.schedule(time, Event::TimerFire { node });
    }

    /// Schedule a scenario action.
    pub fn schedule_action(&mut self, time: Timestamp, action: ScenarioAction) {
        self.schedule(time, Event::ScenarioAction(action));
    }

    /// Run simulation until specified time.
    pub fn run_until(&mut self, end_time: Timestamp) -> SimulationResult {
        while let Some(event) = self.event_queue.peek() {
            if event.time > end_time {
                break;
            }

            let event = self.event_queue.pop().expect("peeked event");
            self.advance_time(event.time);
            self.process_event(event.event);

            self.maybe_take_snapshot();
        }

        // Advance to end_time even if no more events
        self.advance_time(end_time);

        // Final snapshot
        self.take_snapshot();

        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
        }
    }

    /// Run simulation for specified duration.
    pub fn run_for(&mut self, duration: Duration) -> SimulationResult {
        self.run_until(self.current_time + duration)
    }

    /// Advance simulation time.
    fn advance_time(&mut self, time: Timestamp) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    /// Process a single event.
    fn process_event(&mut self, event: Event) {
        match event {
            Event::AnnouncementDelivery { to, ann } => {
                let now = self.current_time;
                if let Some(node) = self.nodes.get_mut(&to) {
                    node.handle_announcement(ann, now);
                    self.metrics.messages_delivered += 1;
                }
                self.collect_outgoing(to);
            }
            Event::PacketDelivery {
                to,
                prev_hop,
                packet,
            } => {
                let now = self.current_time;
                if let Some(node) = self.nodes.get_mut(&to) {
                    node.handle_packet(prev_hop, packet, now);
                    self.metrics.messages_delivered += 1;
                }
                self.collect_outgoing(to);
            }
            Event::TimerFire { node } => {
                self.fire_timer(node);
            }
            Event::Originate { node } => {
                let now = self.current_time;
                if let Some(n) = self.nodes.get_mut(&node) {
                    n.handle_trigger(now);
                }
                self.collect_outgoing(node);
            }
            Event::ScenarioAction(action) => {
                self.execute_action(action);
            }
        }
    }

    /// Fire timer work for a node and reschedule the tick.
    fn fire_timer(&mut self, addr: LinkAddr) {
        let now = self.current_time;

        if let Some(node) = self.nodes.get_mut(&addr) {
            node.handle_timer(now);
        } else {
            return;
        }

        self.collect_outgoing(addr);
        self.schedule_timer(addr, now + TIMER_TICK);
    }

    /// Collect outgoing traffic from a node and route it.
    fn collect_outgoing(&mut self, sender: LinkAddr) {
        let (announcements, unicasts) = match self.nodes.get(&sender) {
            Some(node) => node.take_outgoing(),
            None => return,
        };

        for ann in announcements {
            self.broadcast_announcement(sender, ann);
        }
        for (next_hop, packet) in unicasts {
            self.unicast_packet(sender, next_hop, packet);
        }
    }

    /// Fan an announcement out to every active neighbor of the sender.
    fn broadcast_announcement(&mut self, sender: LinkAddr, ann: Announcement) {
        self.metrics.announcements_sent += 1;

        let neighbors = self.topology.neighbors(sender);
        let current_time = self.current_time;

        let mut deliveries = Vec::with_capacity(neighbors.len());
        let mut dropped = 0u64;

        for neighbor in neighbors {
            if let Some(link) = self.topology.get_link(sender, neighbor) {
                if !link.active {
                    continue;
                }
                let loss_rate = link.loss_rate;
                let delay = link.delay;

                if loss_rate > 0.0 && self.random_f64() < loss_rate {
                    dropped += 1;
                    continue;
                }
                deliveries.push((neighbor, delay));
            }
        }

        self.metrics.messages_dropped += dropped;

        for (neighbor, delay) in deliveries {
            self.schedule(
                current_time + delay,
                Event::AnnouncementDelivery { to: neighbor, ann },
            );
        }
    }

    /// Carry a unicast frame to its addressed next hop.
    fn unicast_packet(&mut self, sender: LinkAddr, next_hop: LinkAddr, packet: DataPacket) {
        self.metrics.packets_sent += 1;

        let Some(link) = self.topology.get_link(sender, next_hop) else {
            self.metrics.messages_dropped += 1;
            return;
        };
        if !link.active {
            self.metrics.messages_dropped += 1;
            return;
        }

        let loss_rate = link.loss_rate;
        let delay = link.delay;
        if loss_rate > 0.0 && self.random_f64() < loss_rate {
            self.metrics.messages_dropped += 1;
            return;
        }

        self.schedule(
            self.current_time + delay,
            Event::PacketDelivery {
                to: next_hop,
                prev_hop: sender,
                packet,
            },
        );
    }

    /// Execute a scenario action.
    fn execute_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::Partition { groups } => {
                self.topology.partition(&groups);
            }
            ScenarioAction::HealPartition => {
                self.topology.heal();
            }
            ScenarioAction::DisableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = false;
                }
            }
            ScenarioAction::EnableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = true;
                }
            }
            ScenarioAction::SetLossRate { from, to, rate } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.loss_rate = rate.clamp(0.0, 1.0);
                }
            }
            ScenarioAction::TakeSnapshot => {
                self.take_snapshot();
            }
        }
    }

    /// Check if we should take a snapshot and do so.
    fn maybe_take_snapshot(&mut self) {
        if let Some(next) = self.next_snapshot {
            if self.current_time >= next {
                self.take_snapshot();
                if let Some(interval) = self.snapshot_interval {
                    self.next_snapshot = Some(next + interval);
                }
            }
        }
    }

    /// Take a gradient snapshot.
    pub fn take_snapshot(&mut self) {
        let mut snapshot = GradientSnapshot::new(self.current_time);

        for (addr, node) in &self.nodes {
            snapshot.record_node(*addr, node.hop_count());
        }

        self.metrics.add_snapshot(snapshot);
    }

    /// Generate a random f64 in [0, 1).
    fn random_f64(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.rng_state as f64) / (u64::MAX as f64)
    }
}
