//! Network topology, link properties, and reference hop distances.

use std::collections::VecDeque;

use gradmesh::{Duration, LinkAddr};
use hashbrown::HashMap;

/// Properties of a radio link between two nodes.
#[derive(Debug, Clone)]
pub struct Link {
    /// Packet loss rate (0.0 to 1.0), applied independently per delivery.
    pub loss_rate: f64,
    /// Propagation delay.
    pub delay: Duration,
    /// Whether the link is currently active.
    pub active: bool,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            delay: Duration::from_millis(1),
            active: true,
        }
    }
}

impl Link {
    /// Create a new link with default properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loss rate.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set the delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set whether the link is active.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Network topology defining connectivity between nodes.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Links between pairs of nodes (bidirectional).
    links: HashMap<(LinkAddr, LinkAddr), Link>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fully connected topology for the given nodes.
    pub fn fully_connected(nodes: &[LinkAddr]) -> Self {
        let mut topo = Self::new();
        for (i, &a) in nodes.iter().enumerate() {
            for &b in nodes.iter().skip(i + 1) {
                topo.add_link(a, b, Link::default());
            }
        }
        topo
    }

    /// Create a chain topology (each node connected only to its neighbors).
    pub fn chain(nodes: &[LinkAddr]) -> Self {
        let mut topo = Self::new();
        for window in nodes.windows(2) {
            topo.add_link(window[0], window[1], Link::default());
        }
        topo
    }

    /// Create a star topology (first node is hub, connected to all others).
    pub fn star(nodes: &[LinkAddr]) -> Self {
        let mut topo = Self::new();
        if nodes.is_empty() {
            return topo;
        }
        let hub = nodes[0];
        for &spoke in nodes.iter().skip(1) {
            topo.add_link(hub, spoke, Link::default());
        }
        topo
    }

    /// Create a grid topology with the given width.
    ///
    /// Nodes are laid out row-major; each node is linked to its horizontal
    /// and vertical neighbors. A common stand-in for an evenly deployed
    /// sensor field.
    pub fn grid(nodes: &[LinkAddr], width: usize) -> Self {
        let mut topo = Self::new();
        if width == 0 {
            return topo;
        }
        for (i, &node) in nodes.iter().enumerate() {
            if (i + 1) % width != 0 {
                if let Some(&right) = nodes.get(i + 1) {
                    topo.add_link(node, right, Link::default());
                }
            }
            if let Some(&below) = nodes.get(i + width) {
                topo.add_link(node, below, Link::default());
            }
        }
        topo
    }

    /// Add a bidirectional link between two nodes.
    pub fn add_link(&mut self, a: LinkAddr, b: LinkAddr, link: Link) {
        // Store link with canonical ordering (lower address first).
        let (lo, hi) = Self::canonical_pair(a, b);
        self.links.insert((lo, hi), link);
    }

    /// Get a link between two nodes.
    pub fn get_link(&self, a: LinkAddr, b: LinkAddr) -> Option<&Link> {
        let (lo, hi) = Self::canonical_pair(a, b);
        self.links.get(&(lo, hi))
    }

    /// Get a mutable link between two nodes.
    pub fn get_link_mut(&mut self, a: LinkAddr, b: LinkAddr) -> Option<&mut Link> {
        let (lo, hi) = Self::canonical_pair(a, b);
        self.links.get_mut(&(lo, hi))
    }

    /// Check if two nodes are connected (link exists and is active).
    pub fn is_connected(&self, a: LinkAddr, b: LinkAddr) -> bool {
        self.get_link(a, b).is_some_and(|link| link.active)
    }

    /// Get all nodes that a given node can reach (active links).
    pub fn neighbors(&self, node: LinkAddr) -> Vec<LinkAddr> {
        let mut result = Vec::new();
        for (&(a, b), link) in &self.links {
            if link.active {
                if a == node {
                    result.push(b);
                } else if b == node {
                    result.push(a);
                }
            }
        }
        result
    }

    /// Disable all links crossing between partition groups.
    pub fn partition(&mut self, groups: &[Vec<LinkAddr>]) {
        for (&(a, b), link) in self.links.iter_mut() {
            let a_group = groups.iter().position(|g| g.contains(&a));
            let b_group = groups.iter().position(|g| g.contains(&b));

            if a_group != b_group {
                link.active = false;
            }
        }
    }

    /// Re-enable all links (heal partitions).
    pub fn heal(&mut self) {
        for link in self.links.values_mut() {
            link.active = true;
        }
    }

    /// Set global loss rate for all links.
    pub fn set_global_loss_rate(&mut self, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        for link in self.links.values_mut() {
            link.loss_rate = rate;
        }
    }

    /// True hop distance from every reachable node to `origin`, over active
    /// links (breadth-first search).
    ///
    /// This is the fixed point the gradient protocol should converge to; the
    /// convergence checks compare node estimates against it.
    pub fn hop_distances(&self, origin: LinkAddr) -> HashMap<LinkAddr, u16> {
        let mut distances = HashMap::new();
        distances.insert(origin, 0u16);

        let mut queue = VecDeque::new();
        queue.push_back(origin);

        while let Some(current) = queue.pop_front() {
            let d = distances[&current];
            for neighbor in self.neighbors(current) {
                if !distances.contains_key(&neighbor) {
                    distances.insert(neighbor, d + 1);
                    queue.push_back(neighbor);
                }
            }
        }

        distances
    }

    /// Canonical pair ordering for consistent link storage.
    fn canonical_pair(a: LinkAddr, b: LinkAddr) -> (LinkAddr, LinkAddr) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
