//! Data plane: record origination and sink-side delivery.
//!
//! Sensor nodes originate a record every data interval, after a small
//! randomized jitter so concurrent senders sharing the channel
//! desynchronize. An external stimulus (the trigger channel) forces an
//! immediate origination, bypassing the jitter. Light is sampled on every
//! origination; temperature only on every Nth, the previous reading being
//! re-sent in between.
//!
//! There is no end-to-end acknowledgment: origination failures are
//! invisible to the sender by design.

use crate::debug::DebugEvent;
use crate::node::{Node, Role};
use crate::time::{Duration, Timestamp};
use crate::traits::{Clock, Random, Sensors, Transport};
use crate::types::{DataPacket, Event, LinkAddr};
use crate::wire::DataRecord;

impl<T, R, Clk, S> Node<T, R, Clk, S>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    S: Sensors,
{
    /// Advance the periodic origination schedule.
    ///
    /// When a data period elapses, the actual origination is deferred by a
    /// uniform random jitter below `config.jitter_max`. A pending jitter
    /// deadline is replaced, not stacked, if a new period elapses first.
    pub(crate) fn handle_data_timers(&mut self, now: Timestamp) {
        if self.role == Role::Sink {
            return;
        }

        if let Some(at) = self.next_data_at {
            if now >= at {
                self.next_data_at = Some(at + self.config.data_interval);
                let jitter = self
                    .random
                    .gen_range(0, self.config.jitter_max.as_millis().max(1));
                self.jitter_deadline = Some(now + Duration::from_millis(jitter));
            }
        }

        if let Some(deadline) = self.jitter_deadline {
            if now >= deadline {
                self.jitter_deadline = None;
                self.originate(now);
            }
        }
    }

    /// External stimulus: originate immediately, bypassing the jitter.
    ///
    /// `run()` invokes this when the trigger channel fires; harnesses
    /// driving handlers directly may call it themselves.
    pub fn handle_trigger(&mut self, now: Timestamp) {
        if self.role == Role::Sink {
            return;
        }
        self.originate(now);
    }

    /// Read the sensors, compose a wire record, and send it toward the sink.
    pub(crate) fn originate(&mut self, now: Timestamp) {
        self.light = self.sensors.light();
        if self.temperature_countdown == 0 {
            self.temperature = self.sensors.temperature();
            self.temperature_countdown = self.config.temperature_period;
        }
        self.temperature_countdown -= 1;

        let record = DataRecord {
            node_id: self.addr.node_id(),
            light: self.light,
            temperature: Some(self.temperature),
        };
        let packet = DataPacket {
            originator: self.addr,
            dest: LinkAddr::SINK,
            hops: 0,
            payload: record.encode_to_vec(),
        };

        self.metrics.records_originated += 1;
        emit_debug!(
            self,
            DebugEvent::RecordOriginated {
                timestamp: now,
                node_id: record.node_id,
            }
        );

        // The originator runs the same forwarding decision as a relay;
        // originator and previous hop are both ourselves.
        match self.select_next_hop(self.addr, packet.dest, self.addr) {
            Some(next_hop) => self.forward_packet(next_hop, packet),
            None => {
                self.metrics.packets_dropped += 1;
                emit_debug!(
                    self,
                    DebugEvent::PacketDropped {
                        dest: LinkAddr::SINK,
                        reason: "no forwarding candidate",
                    }
                );
            }
        }
    }

    /// A packet addressed to this node arrived: decode and surface it.
    pub(crate) fn deliver_record(&mut self, prev_hop: LinkAddr, packet: DataPacket) {
        let _ = prev_hop;

        match DataRecord::decode_from_slice(&packet.payload) {
            Ok(record) => {
                self.metrics.records_delivered += 1;
                emit_debug!(
                    self,
                    DebugEvent::RecordDelivered {
                        from: packet.originator,
                        hops: packet.hops,
                    }
                );
                self.push_event(Event::RecordReceived {
                    from: packet.originator,
                    record,
                    hops: packet.hops,
                });
            }
            Err(error) => {
                self.metrics.records_malformed += 1;
                emit_debug!(self, DebugEvent::RecordRejected { error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::traits::test_impls::{MockClock, MockRandom, MockSensors, MockTransport};
    use crate::types::{Announcement, CHANNEL};

    type TestNode = Node<MockTransport, MockRandom, MockClock, MockSensors>;

    fn addr(id: u16) -> LinkAddr {
        LinkAddr::from_node_id(id)
    }

    fn sensor_with_route(own: u16) -> TestNode {
        let mut node = Node::new(
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
            MockSensors::with_values(180, 25),
            addr(own),
            Config::default(),
        );
        // A neighbor one hop from the sink gives us a route
        node.handle_announcement(
            Announcement {
                channel: CHANNEL,
                from: addr(3),
                value: 1,
            },
            Timestamp::ZERO,
        );
        node.transport().take_announcements();
        node
    }

    #[test]
    fn test_originate_composes_record_and_routes_it() {
        let mut node = sensor_with_route(42);
        node.originate(Timestamp::ZERO);

        let sent = node.transport().take_data();
        assert_eq!(sent.len(), 1);
        let (next_hop, packet) = &sent[0];
        assert_eq!(*next_hop, addr(3));
        assert_eq!(packet.originator, addr(42));
        assert_eq!(packet.dest, LinkAddr::SINK);
        assert_eq!(packet.payload, b"42,180,25\0".to_vec());
        assert_eq!(node.metrics().records_originated, 1);
    }

    #[test]
    fn test_originate_without_route_drops() {
        let mut node: TestNode = Node::new(
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
            MockSensors::new(),
            addr(42),
            Config::default(),
        );
        node.originate(Timestamp::ZERO);

        assert!(node.transport().take_data().is_empty());
        assert_eq!(node.metrics().records_originated, 1);
        assert_eq!(node.metrics().packets_dropped, 1);
    }

    #[test]
    fn test_temperature_sampled_every_fifth_origination() {
        let mut node = sensor_with_route(42);
        node.sensors.temperature = 20;

        node.originate(Timestamp::ZERO);
        let first = node.transport().take_data().remove(0).1;
        assert_eq!(first.payload, b"42,180,20\0".to_vec());

        // The live reading changes, but originations 2-5 re-send the sample
        node.sensors.temperature = 99;
        for i in 1..5u64 {
            node.originate(Timestamp::from_secs(i));
            let sent = node.transport().take_data().remove(0).1;
            assert_eq!(sent.payload, b"42,180,20\0".to_vec());
        }

        // The 6th origination samples again
        node.originate(Timestamp::from_secs(5));
        let sixth = node.transport().take_data().remove(0).1;
        assert_eq!(sixth.payload, b"42,180,99\0".to_vec());
    }

    #[test]
    fn test_periodic_origination_respects_jitter() {
        let mut node = sensor_with_route(42);
        node.initialize(Timestamp::ZERO);
        node.transport().take_announcements();

        // Keep the route alive past the origination window
        node.handle_announcement(
            Announcement {
                channel: CHANNEL,
                from: addr(3),
                value: 1,
            },
            Timestamp::from_secs(50),
        );

        // Nothing before the data interval
        node.handle_timer(Timestamp::from_secs(59));
        assert!(node.transport().take_data().is_empty());

        // The period elapses: a jitter deadline is armed, not an immediate
        // send (unless the jitter happened to be zero)
        node.handle_timer(Timestamp::from_secs(60));
        let deadline = node.jitter_deadline;
        let sent_at_period = node.transport().take_data().len();
        match deadline {
            Some(deadline) => {
                assert!(sent_at_period == 0);
                assert!(deadline >= Timestamp::from_secs(60));
                assert!(deadline < Timestamp::from_secs(70));

                node.handle_timer(deadline);
                assert_eq!(node.transport().take_data().len(), 1);
                assert!(node.jitter_deadline.is_none());
            }
            None => assert_eq!(sent_at_period, 1),
        }
    }

    #[test]
    fn test_trigger_bypasses_jitter() {
        let mut node = sensor_with_route(42);
        node.initialize(Timestamp::ZERO);

        node.handle_trigger(Timestamp::from_secs(1));
        assert_eq!(node.transport().take_data().len(), 1);
        assert!(node.jitter_deadline.is_none());
    }

    #[test]
    fn test_sink_delivers_record_as_event() {
        let mut sink: TestNode = Node::sink(
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
            MockSensors::new(),
            Config::default(),
        );
        let packet = DataPacket {
            originator: addr(42),
            dest: LinkAddr::SINK,
            hops: 3,
            payload: b"42,180,25\0".to_vec(),
        };
        sink.handle_data(addr(7), packet, Timestamp::ZERO);

        assert_eq!(sink.metrics().records_delivered, 1);
        match sink.events().try_receive() {
            Ok(Event::RecordReceived { from, record, hops }) => {
                assert_eq!(from, addr(42));
                assert_eq!(record.node_id, 42);
                assert_eq!(record.light, 180);
                assert_eq!(record.temperature, Some(25));
                assert_eq!(hops, 3);
            }
            other => panic!("expected RecordReceived, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_record_is_counted_not_fatal() {
        let mut sink: TestNode = Node::sink(
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
            MockSensors::new(),
            Config::default(),
        );
        let packet = DataPacket {
            originator: addr(42),
            dest: LinkAddr::SINK,
            hops: 1,
            payload: b"garbage".to_vec(),
        };
        sink.handle_data(addr(7), packet, Timestamp::ZERO);

        assert_eq!(sink.metrics().records_delivered, 0);
        assert_eq!(sink.metrics().records_malformed, 1);
        assert!(sink.events().try_receive().is_err());
    }

    #[test]
    fn test_sink_never_originates() {
        let mut sink: TestNode = Node::sink(
            MockTransport::new(),
            MockRandom::new(),
            MockClock::new(),
            MockSensors::new(),
            Config::default(),
        );
        sink.initialize(Timestamp::ZERO);
        sink.handle_trigger(Timestamp::from_secs(1));
        sink.handle_timer(Timestamp::from_secs(120));

        assert!(sink.transport().take_data().is_empty());
        assert_eq!(sink.metrics().records_originated, 0);
    }
}
