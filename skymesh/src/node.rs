//! The per-node protocol state machine.
//!
//! A [`Node`] owns its position, waypoint state, neighbor and routing
//! tables, session bookkeeping and a deterministic RNG stream. The six
//! concurrent tasks of the protocol stack are expressed as synchronous
//! handlers — one per periodic tick plus [`Node::handle_rx`] — each a
//! pure `(now, input) -> outputs` step. The driver drains queued frames
//! with [`Node::take_outgoing`] and side effects with
//! [`Node::take_events`] after every handler call.
//!
//! Forwarding is routed flooding: frames carry no next-hop field, every
//! in-range receiver applies the same rules, and duplicate work is
//! bounded by TTLs, the per-session dedup sets and the path loop check.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SimConfig;
use crate::messages::{DataMsg, DvUpdate, Envelope, Hello, Payload, SessionAck, SessionReq};
use crate::mobility::RandomWaypoint;
use crate::observe::NodeEvent;
use crate::routing::{NeighborTable, RoutingTable};
use crate::session::SessionManager;
use crate::time::Timestamp;
use crate::types::{uniform, NodeId, Position};

/// One drone node: position state plus the full protocol stack.
pub struct Node {
    id: NodeId,
    cfg: Arc<SimConfig>,
    rng: ChaCha8Rng,
    pos: Position,
    waypoint: RandomWaypoint,
    neighbors: NeighborTable,
    routes: RoutingTable,
    sessions: SessionManager,
    hello_seq: u32,
    hello_muted: bool,
    outgoing: Vec<Payload>,
    events: Vec<NodeEvent>,
}

impl Node {
    /// Create a node with a seeded random position and waypoint.
    ///
    /// The RNG stream derives from the master seed and the node id, so
    /// node state is reproducible independent of sibling nodes.
    pub fn new(id: NodeId, cfg: Arc<SimConfig>) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(1 + u64::from(id)));
        let pos = Position::new(
            uniform(&mut rng, 0.0, cfg.world_size.0),
            uniform(&mut rng, 0.0, cfg.world_size.1),
        );
        let waypoint =
            RandomWaypoint::new(&mut rng, cfg.world_size, cfg.speed_mps, cfg.waypoint_pause_s);
        Self {
            id,
            rng,
            pos,
            waypoint,
            neighbors: NeighborTable::new(),
            routes: RoutingTable::new(id),
            sessions: SessionManager::new(id),
            hello_seq: 0,
            hello_muted: false,
            outgoing: Vec::new(),
            events: Vec::new(),
            cfg,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    /// Teleport the node (scenario scripting).
    pub fn set_position(&mut self, pos: Position) {
        self.pos = pos;
    }

    /// Stop or resume Hello beaconing (scenario scripting; models a
    /// silent node whose neighbors must age it out).
    pub fn set_hello_muted(&mut self, muted: bool) {
        self.hello_muted = muted;
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Clear the routing table's `changed` flags after a reporting
    /// period (driven by the snapshot cadence).
    pub fn clear_route_changed(&mut self) {
        self.routes.clear_changed();
    }

    /// Drain frames queued for transmission.
    pub fn take_outgoing(&mut self) -> Vec<Payload> {
        std::mem::take(&mut self.outgoing)
    }

    /// Drain side effects for the metrics/sink layer.
    pub fn take_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- periodic tasks ----

    /// Mobility task: advance toward the waypoint by one tick.
    pub fn on_mobility_tick(&mut self, now: Timestamp) {
        self.waypoint
            .step(&mut self.pos, self.cfg.mobility_step_s, now, &mut self.rng);
    }

    /// Hello task: beacon position with an incrementing sequence.
    pub fn on_hello_tick(&mut self, _now: Timestamp) {
        if self.hello_muted {
            return;
        }
        self.hello_seq += 1;
        self.outgoing.push(Payload::Hello(Hello {
            pos: self.pos,
            seq: self.hello_seq,
        }));
    }

    /// DV task: broadcast the full vector with next hops; receivers
    /// apply split horizon with poisoned reverse against them.
    pub fn on_dv_tick(&mut self, _now: Timestamp) {
        let vector = self.routes.export();
        if vector.is_empty() {
            return;
        }
        self.outgoing.push(Payload::Dv(DvUpdate { vector }));
    }

    /// App task: expire stale handshakes, then initiate one toward the
    /// next round-robin destination unless a session is already live.
    pub fn on_app_tick(&mut self, now: Timestamp) {
        self.sessions.expire(now);
        let Some(dst) = self.sessions.next_destination(self.cfg.num_nodes) else {
            return;
        };
        if self.sessions.has_active(dst) {
            return;
        }
        let session_id = self.sessions.begin(dst, now, self.cfg.app_send_period());
        self.outgoing.push(Payload::SessionReq(SessionReq {
            src: self.id,
            dst,
            session_id,
            ttl: self.cfg.initial_ttl(),
        }));
    }

    /// Aging task: drop silent neighbors, poison dependent routes and
    /// garbage-collect withdrawals older than one advertisement period.
    pub fn on_age_tick(&mut self, now: Timestamp) {
        let dead = self.neighbors.expired(now, self.cfg.neighbor_timeout());
        for &gone in &dead {
            self.neighbors.remove(gone);
            self.events.push(NodeEvent::NeighborDown(gone));
        }
        if !dead.is_empty() {
            self.routes
                .poison_via(&dead, now, self.cfg.log_dv_changes);
        }
        self.routes.collect_poisoned(now, self.cfg.dv_period());
    }

    // ---- receive dispatch ----

    /// Process one delivered frame.
    pub fn handle_rx(&mut self, env: &Envelope, now: Timestamp) {
        if env.sender == self.id {
            return;
        }
        match &env.payload {
            Payload::Hello(hello) => self.handle_hello(env.sender, *hello, now),
            Payload::Dv(update) => self.handle_dv(env.sender, update, now),
            Payload::SessionReq(req) => self.handle_session_req(*req),
            Payload::SessionAck(ack) => self.handle_session_ack(*ack, now),
            Payload::Data(msg) => self.handle_data(msg, now),
        }
    }

    fn handle_hello(&mut self, sender: NodeId, hello: Hello, now: Timestamp) {
        let newly = self.neighbors.refresh(sender, hello.pos, hello.seq, now);
        if newly {
            self.events.push(NodeEvent::NeighborUp(sender));
        }
        self.routes
            .ensure_direct(sender, now, self.cfg.log_dv_changes);
    }

    fn handle_dv(&mut self, sender: NodeId, update: &DvUpdate, now: Timestamp) {
        // Advertisements from nodes we have not heard a Hello from are
        // ignored: installing a next hop that is not a live neighbor
        // would break the routing invariant.
        if !self.neighbors.contains(sender) {
            return;
        }
        self.routes.relax(
            sender,
            &update.vector,
            &self.neighbors,
            now,
            self.cfg.log_dv_changes,
        );
    }

    fn handle_session_req(&mut self, req: SessionReq) {
        if req.dst == self.id {
            // Responder: ack once, and only when a route back exists.
            if self.routes.route(req.src, &self.neighbors).is_none() {
                return;
            }
            if !self.sessions.accept(req.session_id) {
                return;
            }
            // Seed the ack dedup so our own flooded ack is not re-forwarded.
            self.sessions.first_ack_sighting(req.src, req.session_id);
            self.outgoing.push(Payload::SessionAck(SessionAck {
                src: req.src,
                dst: req.dst,
                session_id: req.session_id,
                ttl: self.cfg.initial_ttl(),
            }));
            return;
        }
        // In transit. Covers flooded copies of our own request too: the
        // initiator pre-seeds its dedup set.
        if !self.sessions.first_req_sighting(req.src, req.session_id) {
            return;
        }
        if req.ttl <= 1 {
            return;
        }
        if self.routes.route(req.dst, &self.neighbors).is_none() {
            return;
        }
        self.outgoing.push(Payload::SessionReq(SessionReq {
            ttl: req.ttl - 1,
            ..req
        }));
    }

    fn handle_session_ack(&mut self, ack: SessionAck, now: Timestamp) {
        if ack.src == self.id {
            // Back at the initiator: establish and emit the payload.
            if !self.sessions.complete(ack.dst, ack.session_id) {
                return;
            }
            let payload: Vec<u8> = (0..self.cfg.data_payload_bytes)
                .map(|_| self.rng.gen_range(0..=u8::MAX))
                .collect();
            self.events.push(NodeEvent::DataOriginated {
                dst: ack.dst,
                session_id: ack.session_id,
            });
            self.outgoing.push(Payload::Data(DataMsg {
                src: self.id,
                dst: ack.dst,
                session_id: ack.session_id,
                payload,
                ttl: self.cfg.initial_ttl(),
                path: vec![self.id],
                origin_time: now,
            }));
            return;
        }
        // In transit: forward toward the initiator.
        if !self.sessions.first_ack_sighting(ack.src, ack.session_id) {
            return;
        }
        if ack.ttl <= 1 {
            return;
        }
        if self.routes.route(ack.src, &self.neighbors).is_none() {
            return;
        }
        self.outgoing.push(Payload::SessionAck(SessionAck {
            ttl: ack.ttl - 1,
            ..ack
        }));
    }

    fn handle_data(&mut self, msg: &DataMsg, now: Timestamp) {
        if msg.dst == self.id {
            let mut path = msg.path.clone();
            path.push(self.id);
            self.events.push(NodeEvent::DataDelivered {
                path,
                latency: now.saturating_sub(msg.origin_time),
            });
            return;
        }
        if msg.visited(self.id) {
            return;
        }
        if msg.ttl <= 1 {
            return;
        }
        if self.routes.route(msg.dst, &self.neighbors).is_none() {
            return;
        }
        let mut forwarded = msg.clone();
        forwarded.path.push(self.id);
        forwarded.ttl -= 1;
        self.outgoing.push(Payload::Data(forwarded));
    }
}
