//! Scenario builder for setting up and running simulations.
//!
//! Addresses are assigned deterministically: the sink sits at the
//! well-known `1.0`, sensors take node ids 2, 3, ... in order. The node
//! list returned by `build()` starts with the sink.

use gradmesh::{Config, Duration, LinkAddr, Timestamp};

use crate::event::{Event, ScenarioAction};
use crate::metrics::SimulationResult;
use crate::sim::Simulator;
use crate::topology::Topology;

/// Type of topology to generate.
#[derive(Debug, Clone)]
enum TopologyType {
    /// Fully connected topology.
    FullyConnected,
    /// Chain topology, sink at the head.
    Chain,
    /// Star topology, sink as the hub.
    Star,
    /// Grid topology with the given width, sink in the first cell.
    Grid { width: usize },
    /// Custom topology provided by user.
    Custom(Topology),
}

/// Builder for simulation scenarios.
pub struct ScenarioBuilder {
    /// Number of sensor nodes (the sink is always added).
    num_sensors: usize,
    /// RNG seed for determinism.
    seed: u64,
    /// Topology type to generate (must be explicitly specified).
    topology_type: Option<TopologyType>,
    /// Global packet loss rate.
    loss_rate: f64,
    /// Link delay.
    delay: Duration,
    /// Protocol configuration for every node.
    node_config: Config,
    /// Scheduled actions (indices into the node list, sink = 0).
    actions: Vec<(Timestamp, ScenarioAction)>,
    /// Scheduled origination triggers (node index).
    triggers: Vec<(Timestamp, usize)>,
    /// Snapshot interval.
    snapshot_interval: Option<Duration>,
}

impl ScenarioBuilder {
    /// Create a new scenario with the given number of sensor nodes.
    ///
    /// Note: You MUST specify a topology before calling build(). Use
    /// `.fully_connected()`, `.chain_topology()`, `.star_topology()`,
    /// `.grid_topology(width)`, or `.topology(custom)`.
    pub fn new(num_sensors: usize) -> Self {
        Self {
            num_sensors,
            seed: 42,
            topology_type: None,
            loss_rate: 0.0,
            delay: Duration::from_millis(1),
            node_config: Config::default(),
            actions: Vec::new(),
            triggers: Vec::new(),
            snapshot_interval: None,
        }
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set a custom network topology.
    pub fn topology(mut self, topo: Topology) -> Self {
        self.topology_type = Some(TopologyType::Custom(topo));
        self
    }

    /// Use fully connected topology.
    pub fn fully_connected(mut self) -> Self {
        self.topology_type = Some(TopologyType::FullyConnected);
        self
    }

    /// Use chain topology with the sink at the head.
    pub fn chain_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Chain);
        self
    }

    /// Use star topology with the sink as the hub.
    pub fn star_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Star);
        self
    }

    /// Use grid topology with the given width, sink in the first cell.
    pub fn grid_topology(mut self, width: usize) -> Self {
        self.topology_type = Some(TopologyType::Grid { width });
        self
    }

    /// Set global packet loss rate.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set link delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the protocol configuration applied to every node.
    pub fn with_node_config(mut self, config: Config) -> Self {
        self.node_config = config;
        self
    }

    /// Set snapshot interval for metrics collection.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = Some(interval);
        self
    }

    /// Schedule a network partition at the specified time. Groups are
    /// indices into the node list (0 = sink).
    pub fn partition_at(mut self, time: Timestamp, groups: Vec<Vec<usize>>) -> Self {
        self.actions.push((
            time,
            ScenarioAction::Partition {
                groups: groups
                    .into_iter()
                    .map(|g| g.into_iter().map(index_placeholder).collect())
                    .collect(),
            },
        ));
        self
    }

    /// Schedule partition healing at the specified time.
    pub fn heal_at(mut self, time: Timestamp) -> Self {
        self.actions.push((time, ScenarioAction::HealPartition));
        self
    }

    /// Schedule a link failure between two node indices.
    pub fn disable_link_at(mut self, time: Timestamp, a: usize, b: usize) -> Self {
        self.actions.push((
            time,
            ScenarioAction::DisableLink {
                from: index_placeholder(a),
                to: index_placeholder(b),
            },
        ));
        self
    }

    /// Schedule a snapshot at the specified time.
    pub fn snapshot_at(mut self, time: Timestamp) -> Self {
        self.actions.push((time, ScenarioAction::TakeSnapshot));
        self
    }

    /// Schedule an origination stimulus for the node at `index`.
    pub fn originate_at(mut self, time: Timestamp, index: usize) -> Self {
        self.triggers.push((time, index));
        self
    }

    /// Build the simulator with all nodes and topology.
    ///
    /// Returns the simulator and the node list; `nodes[0]` is the sink.
    pub fn build(self) -> (Simulator, Vec<LinkAddr>) {
        // Deterministic addressing: sink at 1.0, sensors from node id 2
        let mut node_addrs = Vec::with_capacity(self.num_sensors + 1);
        node_addrs.push(LinkAddr::SINK);
        for i in 0..self.num_sensors {
            node_addrs.push(LinkAddr::from_node_id(2 + i as u16));
        }

        let mut topo = match self.topology_type {
            Some(TopologyType::FullyConnected) => Topology::fully_connected(&node_addrs),
            Some(TopologyType::Chain) => Topology::chain(&node_addrs),
            Some(TopologyType::Star) => Topology::star(&node_addrs),
            Some(TopologyType::Grid { width }) => Topology::grid(&node_addrs, width),
            Some(TopologyType::Custom(t)) => t,
            None => panic!(
                "Topology must be explicitly specified. \
                Use .fully_connected(), .chain_topology(), .star_topology(), \
                .grid_topology(), or .topology()"
            ),
        };

        // Apply global loss and delay
        if self.loss_rate > 0.0 {
            topo.set_global_loss_rate(self.loss_rate);
        }
        for i in 0..node_addrs.len() {
            for j in (i + 1)..node_addrs.len() {
                if let Some(link) = topo.get_link_mut(node_addrs[i], node_addrs[j]) {
                    link.delay = self.delay;
                }
            }
        }

        // Topology must be set before nodes announce themselves
        let mut sim = Simulator::new(self.seed)
            .with_topology(topo)
            .with_node_config(self.node_config.clone());
        if let Some(interval) = self.snapshot_interval {
            sim = sim.with_snapshot_interval(interval);
        }

        sim.add_sink();
        for &addr in node_addrs.iter().skip(1) {
            sim.add_sensor(addr);
        }

        // Schedule actions, resolving index placeholders to addresses
        for (time, action) in self.actions {
            let resolved = resolve_action(action, &node_addrs);
            sim.schedule_action(time, resolved);
        }
        for (time, index) in self.triggers {
            if let Some(&node) = node_addrs.get(index) {
                sim.schedule(time, Event::Originate { node });
            }
        }

        (sim, node_addrs)
    }

    /// Build and run the simulation for the specified duration.
    pub fn run_for(self, duration: Duration) -> SimulationResult {
        let (mut sim, _) = self.build();
        sim.run_for(duration)
    }
}

/// Encode a node-list index as a placeholder address, resolved in build().
fn index_placeholder(index: usize) -> LinkAddr {
    LinkAddr::from_node_id(index as u16)
}

/// Resolve placeholder addresses (node-list indices) to real addresses.
fn resolve_action(action: ScenarioAction, node_addrs: &[LinkAddr]) -> ScenarioAction {
    let resolve = |placeholder: LinkAddr| -> LinkAddr {
        node_addrs
            .get(placeholder.node_id() as usize)
            .copied()
            .unwrap_or(placeholder)
    };

    match action {
        ScenarioAction::Partition { groups } => ScenarioAction::Partition {
            groups: groups
                .into_iter()
                .map(|g| g.into_iter().map(resolve).collect())
                .collect(),
        },
        ScenarioAction::DisableLink { from, to } => ScenarioAction::DisableLink {
            from: resolve(from),
            to: resolve(to),
        },
        ScenarioAction::EnableLink { from, to } => ScenarioAction::EnableLink {
            from: resolve(from),
            to: resolve(to),
        },
        ScenarioAction::SetLossRate { from, to, rate } => ScenarioAction::SetLossRate {
            from: resolve(from),
            to: resolve(to),
            rate,
        },
        other => other,
    }
}

/// Convenience function for a fully connected N-sensor scenario.
pub fn simple_scenario(num_sensors: usize) -> ScenarioBuilder {
    ScenarioBuilder::new(num_sensors).fully_connected()
}
