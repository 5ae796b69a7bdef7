//! gradsim - Discrete event network simulator for gradmesh protocol testing.
//!
//! This crate provides a deterministic, discrete-event simulator for testing
//! the gradmesh routing protocol at scale without real-time delays.
//!
//! # Features
//!
//! - **Discrete event simulation**: No real-time delays, deterministic ordering
//! - **Multiple nodes in single process**: Simulate entire networks efficiently
//! - **Configurable topology**: Fully connected, chain, star, grid, or custom
//! - **Link properties**: Packet loss and delay per link
//! - **Scenario builder**: Easy test setup with scheduled partitions, healing,
//!   link failures, and origination stimuli
//! - **Metrics collection**: Gradient snapshots, message counts, convergence
//!   checking against true BFS hop distances
//!
//! # Example
//!
//! ```
//! use gradsim::{Duration, ScenarioBuilder};
//!
//! // A sink plus four sensors in a chain, run for two minutes
//! let (mut sim, nodes) = ScenarioBuilder::new(4)
//!     .with_seed(42)
//!     .chain_topology()
//!     .build();
//! let result = sim.run_for(Duration::from_secs(120));
//!
//! // Every node's estimate equals its true hop distance to the sink
//! let expected = sim.topology().hop_distances(nodes[0]);
//! assert!(result.converged_to(&expected));
//! ```
//!
//! # Architecture
//!
//! The simulator uses a priority queue of events ordered by
//! `(time, sequence_number)`. The main loop pops the next event, advances
//! simulation time, calls the target node's handlers directly
//! (`handle_inbound`, `handle_timer`, `handle_trigger`) instead of using the
//! async `node.run()` method, then routes the traffic the handler queued:
//! announcements fan out to every active neighbor with per-link loss and
//! delay, unicast data frames travel to their addressed next hop only.

pub mod event;
pub mod metrics;
pub mod node;
pub mod scenario;
pub mod sim;
pub mod topology;

// Re-export main types
pub use event::{Event, ScenarioAction, ScheduledEvent};
pub use gradmesh::{Duration, HopCount, LinkAddr, Timestamp, MAX_HOP_COUNT};
pub use metrics::{GradientSnapshot, SimMetrics, SimulationResult};
pub use node::SimNode;
pub use scenario::{simple_scenario, ScenarioBuilder};
pub use sim::Simulator;
pub use topology::{Link, Topology};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_converges_to_bfs_distances() {
        let (mut sim, nodes) = ScenarioBuilder::new(4)
            .with_seed(42)
            .chain_topology()
            .with_snapshot_interval(Duration::from_secs(10))
            .build();

        let result = sim.run_for(Duration::from_secs(120));

        let expected = sim.topology().hop_distances(nodes[0]);
        assert!(result.converged_to(&expected), "chain should converge");

        // Node i sits i hops down the chain
        for (i, addr) in nodes.iter().enumerate() {
            assert_eq!(sim.node(addr).unwrap().hop_count(), i as u16);
        }
    }

    #[test]
    fn test_star_converges_to_one_hop() {
        let (mut sim, nodes) = ScenarioBuilder::new(8)
            .with_seed(7)
            .star_topology()
            .build();

        let result = sim.run_for(Duration::from_secs(60));

        let expected = sim.topology().hop_distances(nodes[0]);
        assert!(result.converged_to(&expected));
        for addr in nodes.iter().skip(1) {
            assert_eq!(result.final_hop_count(*addr), Some(1));
        }
    }

    #[test]
    fn test_grid_converges_to_bfs_distances() {
        // Sink plus 8 sensors in a 3x3 grid
        let (mut sim, nodes) = ScenarioBuilder::new(8)
            .with_seed(11)
            .grid_topology(3)
            .with_snapshot_interval(Duration::from_secs(10))
            .build();

        let result = sim.run_for(Duration::from_secs(120));

        let expected = sim.topology().hop_distances(nodes[0]);
        assert!(result.converged_to(&expected));
        // Opposite corner of the grid is four hops out
        assert_eq!(result.final_hop_count(nodes[8]), Some(4));
    }

    #[test]
    fn test_gradient_stays_stable_after_convergence() {
        let (mut sim, nodes) = ScenarioBuilder::new(3)
            .with_seed(5)
            .chain_topology()
            .with_snapshot_interval(Duration::from_secs(10))
            .build();

        let result = sim.run_for(Duration::from_secs(300));
        let expected = sim.topology().hop_distances(nodes[0]);

        // Converged early and every later snapshot still matches
        let converged_at = result
            .metrics
            .convergence_time(&expected)
            .expect("should converge");
        assert!(converged_at <= Timestamp::from_secs(10));
        for snapshot in &result.metrics.snapshots {
            if snapshot.time >= converged_at {
                assert!(
                    snapshot.matches(&expected),
                    "gradient drifted at {:?}",
                    snapshot.time
                );
            }
        }
    }

    #[test]
    fn test_periodic_bumps_heal_packet_loss() {
        let (mut sim, nodes) = ScenarioBuilder::new(2)
            .with_seed(42)
            .chain_topology()
            .with_loss_rate(0.2)
            .with_snapshot_interval(Duration::from_secs(10))
            .build();

        let result = sim.run_for(Duration::from_secs(600));

        let expected = sim.topology().hop_distances(nodes[0]);
        assert!(
            result.metrics.convergence_time(&expected).is_some(),
            "lossy chain should still converge via periodic bumps"
        );
        // Loss was actually exercised
        assert!(result.metrics.messages_dropped > 0);
        // And data still got through end to end
        assert!(sim.node(&nodes[0]).unwrap().metrics().records_delivered > 0);
    }

    #[test]
    fn test_partition_and_heal_reconverges() {
        // Chain sink-2-3-4; the tail sensor is cut off, then healed
        let (mut sim, nodes) = ScenarioBuilder::new(3)
            .with_seed(42)
            .chain_topology()
            .partition_at(Timestamp::from_secs(100), vec![vec![0, 1, 2], vec![3]])
            .heal_at(Timestamp::from_secs(300))
            .build();

        let result = sim.run_for(Duration::from_secs(600));

        // Healed topology equals the original chain
        let expected = sim.topology().hop_distances(nodes[0]);
        assert!(result.converged_to(&expected));
        assert_eq!(result.final_hop_count(nodes[3]), Some(3));
    }

    #[test]
    fn test_diamond_reroutes_around_dead_link() {
        // sink=0, a=1, b=2, c=3:
        //   sink - a, sink - b, a - c, b - c
        let addrs: Vec<LinkAddr> = [1u16, 2, 3, 4].iter().map(|&id| LinkAddr::from_node_id(id)).collect();
        let mut topo = Topology::new();
        topo.add_link(addrs[0], addrs[1], Link::new());
        topo.add_link(addrs[0], addrs[2], Link::new());
        topo.add_link(addrs[1], addrs[3], Link::new());
        topo.add_link(addrs[2], addrs[3], Link::new());

        let (mut sim, nodes) = ScenarioBuilder::new(3)
            .with_seed(9)
            .topology(topo)
            .disable_link_at(Timestamp::from_secs(60), 0, 1)
            .build();

        let result = sim.run_for(Duration::from_secs(600));

        // With sink-a dead, a's only path is a-c-b-sink
        let expected = sim.topology().hop_distances(nodes[0]);
        assert!(result.converged_to(&expected));
        assert_eq!(result.final_hop_count(nodes[1]), Some(3));
        assert_eq!(result.final_hop_count(nodes[2]), Some(1));
        assert_eq!(result.final_hop_count(nodes[3]), Some(2));
    }

    #[test]
    fn test_records_reach_sink_across_hops() {
        let (mut sim, nodes) = ScenarioBuilder::new(2)
            .with_seed(42)
            .chain_topology()
            .build();

        sim.run_for(Duration::from_secs(250));

        let sink = sim.node(&nodes[0]).unwrap();
        assert!(sink.metrics().records_delivered >= 4);
        assert_eq!(sink.metrics().records_malformed, 0);

        // The far sensor's records crossed two hops with its own readings
        let far_id = nodes[2].node_id();
        let events = sink.take_events();
        let far_record = events
            .iter()
            .find_map(|event| match event {
                gradmesh::Event::RecordReceived { from, record, hops }
                    if from.node_id() == far_id =>
                {
                    Some((record.clone(), *hops))
                }
                _ => None,
            })
            .expect("far sensor's record should reach the sink");

        let (record, hops) = far_record;
        assert_eq!(hops, 2);
        assert_eq!(record.node_id, far_id);
        assert_eq!(record.light, 100 + far_id as i32);
        assert_eq!(record.temperature, Some(20 + (far_id as i32) % 10));
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let run = |seed: u64| {
            let (mut sim, nodes) = ScenarioBuilder::new(3)
                .with_seed(seed)
                .chain_topology()
                .with_loss_rate(0.1)
                .with_snapshot_interval(Duration::from_secs(10))
                .build();
            let result = sim.run_for(Duration::from_secs(120));
            let expected = sim.topology().hop_distances(nodes[0]);
            (
                result.metrics.announcements_sent,
                result.metrics.packets_sent,
                result.metrics.messages_dropped,
                result.metrics.convergence_time(&expected),
            )
        };

        assert_eq!(run(42), run(42));
    }
}
