//! Node implementation - the main protocol state machine.
//!
//! The Node struct holds all routing state and provides an async `run()`
//! method that drives the protocol. It is fully event-driven:
//! - Incoming transport messages trigger announcement/forwarding handling
//! - The trigger channel forces an immediate origination
//! - Internal timers drive announcement bumps, originations, and neighbor
//!   liveness
//!
//! Every handler runs to completion before the next event is processed;
//! there is no preemption and no shared-memory concurrency inside the core.
//! The simulator calls the `handle_*` entry points directly with explicit
//! timestamps instead of using the async `run()` method.
//!
//! # Usage
//!
//! ```ignore
//! let mut node = Node::new(transport, random, clock, sensors, addr, Config::default());
//!
//! // Spawn the node's run loop
//! spawn(async move {
//!     node.run().await;
//! });
//!
//! // Force an origination (e.g. from a button ISR)
//! node.trigger().try_send(()).ok();
//!
//! // Receive protocol events
//! let event = node.events().receive().await;
//! ```

use embassy_sync::channel::Channel;

use crate::config::Config;
use crate::debug::DebugChannel;
use crate::gradient::LocalRoutingState;
use crate::neighbors::NeighborTable;
use crate::time::Timestamp;
use crate::traits::{Clock, EventChannel, Random, Sensors, Transport, TriggerChannel};
use crate::types::{Event, HopCount, Inbound, LinkAddr, Metrics};

/// Role of a node in the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Originates sensor records and relays packets toward the sink.
    Sensor,
    /// Final destination for all records: hop count fixed at 0, no neighbor
    /// table, forwarding disabled.
    Sink,
}

/// The main protocol node.
///
/// Generic over:
/// - `T`: Transport implementation
/// - `R`: Random number generator
/// - `Clk`: Clock/timer implementation
/// - `S`: Sensor access
///
/// The node is fully event-driven. Call `run()` to start the main loop, or
/// drive the `handle_*` methods directly.
pub struct Node<T, R, Clk, S> {
    // Dependencies (injected)
    pub(crate) transport: T,
    pub(crate) random: R,
    pub(crate) clock: Clk,
    pub(crate) sensors: S,

    // Identity
    pub(crate) addr: LinkAddr,
    pub(crate) role: Role,
    pub(crate) config: Config,

    // Routing state
    pub(crate) table: NeighborTable,
    pub(crate) state: LocalRoutingState,

    // Application-level channels
    pub(crate) events: EventChannel,
    pub(crate) trigger: TriggerChannel,
    pub(crate) debug: DebugChannel,

    // Scheduling
    pub(crate) last_announce: Option<Timestamp>,
    pub(crate) next_data_at: Option<Timestamp>,
    pub(crate) jitter_deadline: Option<Timestamp>,

    // Sensor sampling state
    pub(crate) light: i32,
    pub(crate) temperature: i32,
    pub(crate) temperature_countdown: u32,

    // Metrics
    pub(crate) metrics: Metrics,
}

impl<T, R, Clk, S> Node<T, R, Clk, S>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    S: Sensors,
{
    /// Create a sensor node with the given link address.
    pub fn new(transport: T, random: R, clock: Clk, sensors: S, addr: LinkAddr, config: Config) -> Self {
        Self::with_role(
            transport,
            random,
            clock,
            sensors,
            addr,
            Role::Sensor,
            LocalRoutingState::unreachable(),
            config,
        )
    }

    /// Create the sink node at the well-known sink address.
    pub fn sink(transport: T, random: R, clock: Clk, sensors: S, config: Config) -> Self {
        Self::with_role(
            transport,
            random,
            clock,
            sensors,
            LinkAddr::SINK,
            Role::Sink,
            LocalRoutingState::sink(),
            config,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn with_role(
        transport: T,
        random: R,
        clock: Clk,
        sensors: S,
        addr: LinkAddr,
        role: Role,
        state: LocalRoutingState,
        config: Config,
    ) -> Self {
        let table = NeighborTable::with_capacity(config.neighbor_capacity);
        Self {
            transport,
            random,
            clock,
            sensors,

            addr,
            role,
            config,

            table,
            state,

            events: Channel::new(),
            trigger: Channel::new(),
            debug: Channel::new(),

            last_announce: None,
            next_data_at: None,
            jitter_deadline: None,

            light: 0,
            temperature: 0,
            temperature_countdown: 0,

            metrics: Metrics::new(),
        }
    }

    /// Announce our presence and arm the periodic timers.
    ///
    /// Call once before the first event is processed (done by `run()`).
    pub fn initialize(&mut self, now: Timestamp) {
        self.send_announcement(now);
        if self.role == Role::Sensor {
            self.next_data_at = Some(now + self.config.data_interval);
        }
    }

    /// This node's link address.
    pub fn addr(&self) -> LinkAddr {
        self.addr
    }

    /// This node's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// True for the sink node.
    pub fn is_sink(&self) -> bool {
        self.role == Role::Sink
    }

    /// Current hop-count estimate toward the sink.
    pub fn hop_count(&self) -> HopCount {
        self.state.hop_count
    }

    /// The value last published via the announcement channel.
    pub fn announced_value(&self) -> HopCount {
        self.state.announced
    }

    /// Number of tracked one-hop neighbors.
    pub fn neighbor_count(&self) -> usize {
        self.table.len()
    }

    /// The neighbor table (read-only).
    pub fn neighbors(&self) -> &NeighborTable {
        &self.table
    }

    /// Protocol configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the transport reference.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the clock reference.
    pub fn clock(&self) -> &Clk {
        &self.clock
    }

    /// Channel for protocol events (received records, gradient changes).
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Channel for forcing an immediate origination (external stimulus).
    pub fn trigger(&self) -> &TriggerChannel {
        &self.trigger
    }

    /// Channel carrying protocol trace events.
    pub fn debug_channel(&self) -> &DebugChannel {
        &self.debug
    }

    /// Protocol activity counters.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Push an event to the events channel.
    pub(crate) fn push_event(&mut self, event: Event) {
        let _ = self.events.try_send(event);
    }

    /// Handle a message delivered by the transport.
    pub fn handle_inbound(&mut self, msg: Inbound, now: Timestamp) {
        match msg {
            Inbound::Announcement(ann) => self.handle_announcement(ann, now),
            Inbound::Data { prev_hop, packet } => self.handle_data(prev_hop, packet, now),
        }
    }

    /// Handle timer expiry: neighbor liveness, the periodic announcement
    /// bump, and the data origination schedule.
    pub fn handle_timer(&mut self, now: Timestamp) {
        // Neighbor liveness sweep. Eviction may raise our own hop count if
        // the removed neighbor held the minimum.
        let expired = self.table.take_expired(now);
        if !expired.is_empty() {
            for addr in expired {
                emit_debug!(
                    self,
                    crate::debug::DebugEvent::NeighborExpired {
                        timestamp: now,
                        addr,
                    }
                );
            }
            self.recompute_gradient(now);
        }

        // Periodic bump: unconditional re-broadcast of the current value.
        if self.announce_due(now) {
            self.send_announcement(now);
        }

        // Periodic origination and its jitter deadline.
        self.handle_data_timers(now);
    }

    fn announce_due(&self, now: Timestamp) -> bool {
        match self.last_announce {
            None => true,
            Some(last) => now >= last + self.config.announce_interval,
        }
    }

    /// The earliest instant any timer work becomes due.
    pub fn next_wake(&self, now: Timestamp) -> Timestamp {
        let mut wake = match self.last_announce {
            Some(last) => last + self.config.announce_interval,
            None => now,
        };
        if let Some(deadline) = self.table.next_deadline() {
            wake = wake.min(deadline);
        }
        if let Some(at) = self.next_data_at {
            wake = wake.min(at);
        }
        if let Some(deadline) = self.jitter_deadline {
            wake = wake.min(deadline);
        }
        wake.max(now)
    }

    /// Run the node's main loop.
    ///
    /// Fully event-driven, runs forever. Handles incoming transport
    /// messages, origination triggers, and timer work in run-to-completion
    /// turns. Call this from an async task/executor.
    pub async fn run(&mut self) -> ! {
        use embassy_futures::select::{select3, Either3};

        let now = self.clock.now();
        self.initialize(now);

        loop {
            let wake = self.next_wake(self.clock.now());

            let result = select3(
                self.transport.incoming().receive(),
                self.trigger.receive(),
                self.clock.sleep_until(wake),
            )
            .await;

            match result {
                Either3::First(msg) => {
                    let now = self.clock.now();
                    self.handle_inbound(msg, now);
                }
                Either3::Second(()) => {
                    let now = self.clock.now();
                    self.handle_trigger(now);
                }
                Either3::Third(()) => {
                    let now = self.clock.now();
                    self.handle_timer(now);
                }
            }
        }
    }
}
