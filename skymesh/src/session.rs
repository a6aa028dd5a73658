//! Session handshake bookkeeping.
//!
//! The handshake is a sequence discipline, not authentication: a source
//! sends a SessionReq, moves to `PendingAck`, and emits exactly one
//! DataMsg when the matching SessionAck returns (`Established`). A
//! pending session that sees no ack within one app period falls back to
//! having no session, freeing the destination for a retry.
//!
//! The manager also owns the forwarding dedup sets: req and ack floods
//! are each forwarded at most once per `(initiator, session id)`.

use hashbrown::{HashMap, HashSet};

use crate::time::{Duration, Timestamp};
use crate::types::NodeId;

/// Outbound session state for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Request sent, ack outstanding. Expires at the deadline.
    PendingAck { id: u64, expires_at: Timestamp },
    /// Handshake complete; the session's DataMsg has been emitted.
    Established { id: u64 },
}

/// Session bookkeeping for one node.
#[derive(Debug)]
pub struct SessionManager {
    owner: NodeId,
    next_serial: u32,
    /// Outbound sessions keyed by destination. Absence means "none".
    outbound: HashMap<NodeId, SessionState>,
    /// Session ids this node has accepted as responder.
    accepted: HashSet<u64>,
    /// Req frames already forwarded, keyed `(initiator, session id)`.
    seen_reqs: HashSet<(NodeId, u64)>,
    /// Ack frames already forwarded, keyed `(initiator, session id)`.
    seen_acks: HashSet<(NodeId, u64)>,
    /// Round-robin destination cursor.
    cursor: NodeId,
}

impl SessionManager {
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            next_serial: 0,
            outbound: HashMap::new(),
            accepted: HashSet::new(),
            seen_reqs: HashSet::new(),
            seen_acks: HashSet::new(),
            cursor: 0,
        }
    }

    /// Next destination in the round-robin cycle over `[0, num_nodes)`,
    /// skipping the owner. `None` only in a single-node world.
    pub fn next_destination(&mut self, num_nodes: usize) -> Option<NodeId> {
        if num_nodes < 2 {
            return None;
        }
        let n = num_nodes as NodeId;
        let mut dst = self.cursor % n;
        if dst == self.owner {
            dst = (dst + 1) % n;
        }
        self.cursor = (dst + 1) % n;
        Some(dst)
    }

    /// Whether a session toward `dst` is pending or established.
    pub fn has_active(&self, dst: NodeId) -> bool {
        self.outbound.contains_key(&dst)
    }

    /// State of the session toward `dst`, if any.
    pub fn state(&self, dst: NodeId) -> Option<SessionState> {
        self.outbound.get(&dst).copied()
    }

    /// Start a session toward `dst`: assign a fresh globally-unique id
    /// and move to `PendingAck`. The id also seeds the req dedup set so
    /// the source never re-forwards its own flooded request.
    pub fn begin(&mut self, dst: NodeId, now: Timestamp, ack_timeout: Duration) -> u64 {
        let id = (u64::from(self.owner) << 32) | u64::from(self.next_serial);
        self.next_serial += 1;
        self.outbound.insert(
            dst,
            SessionState::PendingAck {
                id,
                expires_at: now.saturating_add(ack_timeout),
            },
        );
        self.seen_reqs.insert((self.owner, id));
        id
    }

    /// Drop pending sessions whose ack deadline has passed.
    pub fn expire(&mut self, now: Timestamp) {
        self.outbound.retain(|_, state| match state {
            SessionState::PendingAck { expires_at, .. } => now < *expires_at,
            SessionState::Established { .. } => true,
        });
    }

    /// Handle a SessionAck arriving at the initiator. Returns true when
    /// it matches the pending session toward `responder`, which then
    /// becomes established; stale or duplicate acks return false.
    pub fn complete(&mut self, responder: NodeId, session_id: u64) -> bool {
        match self.outbound.get_mut(&responder) {
            Some(state) => match *state {
                SessionState::PendingAck { id, .. } if id == session_id => {
                    *state = SessionState::Established { id };
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Responder side: record an accepted session id. Returns true the
    /// first time; duplicates are suppressed.
    pub fn accept(&mut self, session_id: u64) -> bool {
        self.accepted.insert(session_id)
    }

    /// Forwarding dedup for req frames. Returns true exactly once per
    /// `(initiator, session id)`.
    pub fn first_req_sighting(&mut self, initiator: NodeId, session_id: u64) -> bool {
        self.seen_reqs.insert((initiator, session_id))
    }

    /// Forwarding dedup for ack frames.
    pub fn first_ack_sighting(&mut self, initiator: NodeId, session_id: u64) -> bool {
        self.seen_acks.insert((initiator, session_id))
    }
}
