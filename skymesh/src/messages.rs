//! Message types exchanged over the shared medium.
//!
//! Every frame is an [`Envelope`] wrapping one of five payload kinds.
//! Frames never leave process memory, so there is no wire format; the
//! closed [`Payload`] enum also makes an "unknown message kind"
//! unrepresentable.

use crate::time::Timestamp;
use crate::types::{Cost, NodeId, Position};

/// Frame metadata common to every transmission.
///
/// `sent_at` is stamped by the medium at the instant the frame is
/// admitted onto the air (after MAC contention), not when the node
/// queued it.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Transmitting node.
    pub sender: NodeId,
    /// Virtual time of transmission start.
    pub sent_at: Timestamp,
    /// The payload variant.
    pub payload: Payload,
}

impl Envelope {
    /// Short label for the payload kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self.payload {
            Payload::Hello(_) => "hello",
            Payload::Dv(_) => "dv",
            Payload::SessionReq(_) => "session-req",
            Payload::SessionAck(_) => "session-ack",
            Payload::Data(_) => "data",
        }
    }
}

/// The five frame kinds of the protocol stack.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Neighbor discovery beacon.
    Hello(Hello),
    /// Distance-vector advertisement.
    Dv(DvUpdate),
    /// Session handshake request (initiator -> responder).
    SessionReq(SessionReq),
    /// Session handshake acknowledgment (responder -> initiator).
    SessionAck(SessionAck),
    /// Application data, emitted only after a completed handshake.
    Data(DataMsg),
}

/// Periodic beacon carrying the sender's position.
#[derive(Debug, Clone, Copy)]
pub struct Hello {
    /// Sender position at transmission time.
    pub pos: Position,
    /// Per-sender sequence number, incremented each beacon.
    pub seq: u32,
}

/// One advertised route: destination, hop cost and the advertiser's
/// next hop toward it.
///
/// Carrying the next hop lets receivers apply split horizon with
/// poisoned reverse on ingress: an entry whose `next_hop` is the
/// receiver itself is treated as an infinite cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DvEntry {
    pub dest: NodeId,
    pub cost: Cost,
    pub next_hop: NodeId,
}

/// Distance-vector advertisement: the sender's full table (minus its
/// self entry), sorted by destination. One broadcast serves every
/// in-range neighbor; the split-horizon rule is applied by receivers.
/// Unreachable destinations are included at
/// [`crate::types::COST_INFINITE`] so withdrawals propagate.
#[derive(Debug, Clone)]
pub struct DvUpdate {
    /// Advertised routes, sorted by destination.
    pub vector: Vec<DvEntry>,
}

/// Handshake request. `src`/`dst` are the session endpoints; any node
/// may forward the frame toward `dst`.
#[derive(Debug, Clone, Copy)]
pub struct SessionReq {
    pub src: NodeId,
    pub dst: NodeId,
    pub session_id: u64,
    /// Remaining forwarding hops.
    pub ttl: u8,
}

/// Handshake acknowledgment. `src`/`dst` still name the original
/// session endpoints; the frame flows from `dst` back toward `src`.
#[derive(Debug, Clone, Copy)]
pub struct SessionAck {
    pub src: NodeId,
    pub dst: NodeId,
    pub session_id: u64,
    /// Remaining forwarding hops.
    pub ttl: u8,
}

/// Application data packet, created only after the handshake succeeds.
#[derive(Debug, Clone)]
pub struct DataMsg {
    pub src: NodeId,
    pub dst: NodeId,
    pub session_id: u64,
    pub payload: Vec<u8>,
    /// Remaining forwarding hops.
    pub ttl: u8,
    /// Ordered trace of nodes visited, starting with `src`. Forwarders
    /// append themselves; a node already present drops the frame.
    pub path: Vec<NodeId>,
    /// Emission time at the source, for end-to-end latency.
    pub origin_time: Timestamp,
}

impl DataMsg {
    /// Whether `node` already appears on the path trace.
    pub fn visited(&self, node: NodeId) -> bool {
        self.path.contains(&node)
    }
}
