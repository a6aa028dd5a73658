//! Simulation orchestrator: the discrete event loop.
//!
//! [`Simulation::new`] validates the configuration, builds the node
//! set and wires it to the shared medium. [`Simulation::run`] drives
//! the event queue until the configured end time: pop the earliest
//! event, advance virtual time, dispatch, collect the node's queued
//! frames and side effects. Same-instant events dispatch in admission
//! order, which reproduces the cooperative FIFO semantics of the
//! protocol model.

use std::collections::BinaryHeap;
use std::sync::Arc;

use log::{info, trace};

use skymesh::config::{ConfigError, SimConfig};
use skymesh::messages::Envelope;
use skymesh::node::Node;
use skymesh::observe::{route_views, NodeEvent, NullSink, ObservationSink, WorldSnapshot};
use skymesh::time::{Duration, Timestamp};
use skymesh::types::{NodeId, Position};

use crate::event::{Event, PendingFrame, ScenarioAction, ScheduledEvent, SequenceNumber};
use crate::medium::{MacDecision, WirelessMedium};
use crate::metrics::{MetricsReport, SimMetrics, SimulationResult};

/// A full simulation instance: nodes, medium, event queue, metrics.
pub struct Simulation {
    cfg: Arc<SimConfig>,
    nodes: Vec<Node>,
    medium: WirelessMedium,
    queue: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
    now: Timestamp,
    metrics: SimMetrics,
    sink: Box<dyn ObservationSink>,
}

impl Simulation {
    /// Validate the configuration and build the node set.
    ///
    /// Node positions and waypoints derive from the seed; registering
    /// the initial task ticks here makes every run start identically.
    pub fn new(cfg: SimConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let cfg = Arc::new(cfg);
        let nodes: Vec<Node> = (0..cfg.num_nodes)
            .map(|id| Node::new(id as NodeId, cfg.clone()))
            .collect();
        let medium = WirelessMedium::new(cfg.clone());

        let mut sim = Self {
            nodes,
            medium,
            queue: BinaryHeap::new(),
            next_seq: 0,
            now: Timestamp::ZERO,
            metrics: SimMetrics::new(),
            sink: Box::new(NullSink),
            cfg,
        };

        for id in 0..sim.nodes.len() as NodeId {
            sim.schedule(Timestamp::ZERO, Event::MobilityTick { node: id });
            sim.schedule(Timestamp::ZERO, Event::HelloTick { node: id });
            sim.schedule(Timestamp::ZERO, Event::DvTick { node: id });
            sim.schedule(Timestamp::ZERO, Event::AppTick { node: id });
            sim.schedule(
                Timestamp::ZERO + sim.cfg.age_check_period(),
                Event::AgeTick { node: id },
            );
        }
        if let Some(period) = sim.cfg.snapshot_period() {
            sim.schedule(Timestamp::ZERO + period, Event::Snapshot);
        }
        Ok(sim)
    }

    /// Replace the observation sink (builder style).
    pub fn with_sink(mut self, sink: Box<dyn ObservationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Current virtual time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[usize::from(id)]
    }

    pub fn medium(&self) -> &WirelessMedium {
        &self.medium
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Pin a node's position before the run (scenario setup).
    pub fn place_node(&mut self, id: NodeId, pos: Position) {
        self.nodes[usize::from(id)].set_position(pos);
    }

    /// Schedule a scripted action.
    pub fn schedule_action(&mut self, at: Timestamp, action: ScenarioAction) {
        self.schedule(at, Event::Action(action));
    }

    /// Drive the event loop to the configured end time.
    ///
    /// Events scheduled past the end are discarded, which is how task
    /// cancellation manifests in the event-queue model.
    pub fn run(&mut self) -> SimulationResult {
        let end = Timestamp::ZERO + self.cfg.sim_time();
        info!(
            "running {} nodes for {:.1}s (seed {})",
            self.nodes.len(),
            self.cfg.sim_time_s,
            self.cfg.seed
        );

        loop {
            let Some(head_at) = self.queue.peek().map(|e| e.at) else {
                break;
            };
            if head_at > end {
                break;
            }
            let item = self.queue.pop().unwrap();
            self.now = item.at;
            self.dispatch(item.event);
        }

        self.now = end;
        self.queue.clear();
        self.emit_snapshot();

        info!(
            "finished: attempted {} delivered {} mac-dropped {}",
            self.metrics.attempted, self.metrics.delivered, self.metrics.mac_dropped
        );
        SimulationResult {
            end_time: self.now,
            metrics: self.metrics.clone(),
        }
    }

    /// Final performance report.
    pub fn report(&self) -> MetricsReport {
        self.metrics.report()
    }

    fn schedule(&mut self, at: Timestamp, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.queue.push(ScheduledEvent::new(at, seq, event));
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::MobilityTick { node } => {
                self.nodes[usize::from(node)].on_mobility_tick(self.now);
                self.collect_from(node);
                self.reschedule(self.cfg.mobility_step(), Event::MobilityTick { node });
            }
            Event::HelloTick { node } => {
                self.nodes[usize::from(node)].on_hello_tick(self.now);
                self.collect_from(node);
                self.reschedule(self.cfg.hello_period(), Event::HelloTick { node });
            }
            Event::DvTick { node } => {
                self.nodes[usize::from(node)].on_dv_tick(self.now);
                self.collect_from(node);
                self.reschedule(self.cfg.dv_period(), Event::DvTick { node });
            }
            Event::AppTick { node } => {
                self.nodes[usize::from(node)].on_app_tick(self.now);
                self.collect_from(node);
                self.reschedule(self.cfg.app_send_period(), Event::AppTick { node });
            }
            Event::AgeTick { node } => {
                self.nodes[usize::from(node)].on_age_tick(self.now);
                self.collect_from(node);
                self.reschedule(self.cfg.age_check_period(), Event::AgeTick { node });
            }
            Event::TxAttempt { frame } => self.dispatch_tx_attempt(frame),
            Event::Deliver { to, frame } => {
                self.nodes[usize::from(to)].handle_rx(&frame, self.now);
                self.collect_from(to);
            }
            Event::Snapshot => {
                self.emit_snapshot();
                if let Some(period) = self.cfg.snapshot_period() {
                    self.reschedule(period, Event::Snapshot);
                }
            }
            Event::Action(action) => self.apply_action(action),
        }
    }

    fn reschedule(&mut self, period: Duration, event: Event) {
        self.schedule(self.now + period, event);
    }

    fn dispatch_tx_attempt(&mut self, frame: PendingFrame) {
        let positions: Vec<Position> = self.nodes.iter().map(|n| n.position()).collect();
        match self
            .medium
            .attempt(frame.sender, frame.attempt, self.now, &positions)
        {
            MacDecision::Admit { deliveries } => {
                let envelope = Envelope {
                    sender: frame.sender,
                    sent_at: self.now,
                    payload: frame.payload,
                };
                trace!(
                    "[{:.6}] node {} on air: {} -> {} receivers",
                    self.now.as_secs_f64(),
                    frame.sender,
                    envelope.kind(),
                    deliveries.len()
                );
                for (to, at) in deliveries {
                    self.schedule(
                        at,
                        Event::Deliver {
                            to,
                            frame: envelope.clone(),
                        },
                    );
                }
            }
            MacDecision::Retry { at } => {
                self.schedule(
                    at,
                    Event::TxAttempt {
                        frame: PendingFrame {
                            attempt: frame.attempt + 1,
                            ..frame
                        },
                    },
                );
            }
            MacDecision::Drop => {
                self.metrics.mac_dropped += 1;
            }
        }
    }

    /// Drain a node's queued frames into the MAC and its side effects
    /// into the metrics and the sink.
    fn collect_from(&mut self, id: NodeId) {
        let node = &mut self.nodes[usize::from(id)];
        let frames = node.take_outgoing();
        let events = node.take_events();

        for payload in frames {
            let at = self.medium.first_attempt_at(self.now);
            self.schedule(
                at,
                Event::TxAttempt {
                    frame: PendingFrame {
                        sender: id,
                        payload,
                        attempt: 1,
                    },
                },
            );
        }
        for event in events {
            match event {
                NodeEvent::NeighborUp(neighbor) => {
                    self.sink.on_neighbor_change(id, neighbor, true);
                }
                NodeEvent::NeighborDown(neighbor) => {
                    self.sink.on_neighbor_change(id, neighbor, false);
                }
                NodeEvent::DataOriginated { .. } => {
                    self.metrics.attempted += 1;
                }
                NodeEvent::DataDelivered { path, latency } => {
                    self.metrics.record_delivery(latency, path.len());
                    self.sink.on_path(&path, self.now);
                }
            }
        }
    }

    fn apply_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::MoveNode { node, to } => {
                self.nodes[usize::from(node)].set_position(to);
            }
            ScenarioAction::MuteHello { node } => {
                self.nodes[usize::from(node)].set_hello_muted(true);
            }
            ScenarioAction::UnmuteHello { node } => {
                self.nodes[usize::from(node)].set_hello_muted(false);
            }
        }
    }

    /// Push the current world state through the sink and clear the
    /// per-entry `changed` flags for the next reporting period.
    fn emit_snapshot(&mut self) {
        let snapshot = WorldSnapshot {
            time: self.now,
            positions: self.nodes.iter().map(|n| n.position()).collect(),
            neighbor_sets: self
                .nodes
                .iter()
                .map(|n| n.neighbors().ids_sorted())
                .collect(),
            routing_tables: self.nodes.iter().map(|n| route_views(n.routes())).collect(),
        };
        self.sink.on_snapshot(&snapshot);
        for node in &mut self.nodes {
            node.clear_route_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected_at_build() {
        let cfg = SimConfig {
            num_nodes: 0,
            ..SimConfig::default()
        };
        assert!(Simulation::new(cfg).is_err());
    }

    #[test]
    fn test_single_node_runs_quietly() {
        let cfg = SimConfig {
            num_nodes: 1,
            sim_time_s: 5.0,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg).expect("valid config");
        let result = sim.run();
        assert_eq!(result.metrics.attempted, 0);
        assert_eq!(result.metrics.delivered, 0);
        assert_eq!(result.end_time, Timestamp::from_secs(5));
    }

    #[test]
    fn test_run_stops_at_sim_time() {
        let cfg = SimConfig {
            num_nodes: 2,
            sim_time_s: 3.0,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg).expect("valid config");
        let result = sim.run();
        assert_eq!(result.end_time, Timestamp::from_secs(3));
        assert!(sim.now() == Timestamp::from_secs(3));
    }

    #[test]
    fn test_hello_exchange_builds_neighborhood() {
        let cfg = SimConfig {
            num_nodes: 2,
            world_size: (200.0, 200.0),
            comm_range: 150.0,
            speed_mps: (0.0, 0.0),
            sim_time_s: 5.0,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg).expect("valid config");
        sim.place_node(0, Position::new(50.0, 100.0));
        sim.place_node(1, Position::new(150.0, 100.0));
        sim.run();

        assert!(sim.node(0).neighbors().contains(1));
        assert!(sim.node(1).neighbors().contains(0));
        assert_eq!(sim.node(0).routes().cost_to(1), Some(1));
    }
}
