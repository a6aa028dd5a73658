//! Event types and priority queue ordering for the discrete event loop.
//!
//! Every suspension point of the cooperative model is an event: the
//! five periodic per-node tasks, MAC transmission attempts, frame
//! deliveries, scheduled snapshots and scripted scenario actions.
//! Same-instant events dispatch in admission (FIFO) order via the
//! sequence number.

use std::cmp::Ordering;

use skymesh::messages::{Envelope, Payload};
use skymesh::time::Timestamp;
use skymesh::types::{NodeId, Position};

/// Unique sequence number for deterministic event ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A frame waiting for the medium, together with its MAC attempt count.
#[derive(Debug, Clone)]
pub struct PendingFrame {
    /// Transmitting node.
    pub sender: NodeId,
    /// The frame body; the envelope is stamped at admission.
    pub payload: Payload,
    /// 1-based carrier-sense/backoff attempt number.
    pub attempt: u8,
}

/// Scripted actions for test scenarios.
#[derive(Debug, Clone)]
pub enum ScenarioAction {
    /// Teleport a node (partition/merge scripting).
    MoveNode { node: NodeId, to: Position },
    /// Stop a node's Hello beaconing so neighbors age it out.
    MuteHello { node: NodeId },
    /// Resume a node's Hello beaconing.
    UnmuteHello { node: NodeId },
}

/// Events in the discrete event simulation.
#[derive(Debug, Clone)]
pub enum Event {
    /// Mobility task tick for a node.
    MobilityTick { node: NodeId },
    /// Hello beacon tick for a node.
    HelloTick { node: NodeId },
    /// Distance-vector advertisement tick for a node.
    DvTick { node: NodeId },
    /// Application/handshake tick for a node.
    AppTick { node: NodeId },
    /// Neighbor aging tick for a node.
    AgeTick { node: NodeId },
    /// Carrier-sense/backoff attempt for a queued frame.
    TxAttempt { frame: PendingFrame },
    /// Deliver a transmitted frame to one receiver.
    Deliver { to: NodeId, frame: Envelope },
    /// Emit a world snapshot to the observation sink.
    Snapshot,
    /// Execute a scripted scenario action.
    Action(ScenarioAction),
}

/// A scheduled event with timestamp and sequence number for ordering.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// When the event should occur.
    pub at: Timestamp,
    /// Sequence number for deterministic ordering of same-time events.
    pub seq: SequenceNumber,
    /// The event to process.
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(at: Timestamp, seq: SequenceNumber, event: Event) -> Self {
        Self { at, seq, event }
    }
}

// Implement ordering for min-heap (BinaryHeap is max-heap, so we reverse).
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap: earlier time first, then lower
        // sequence number (FIFO among same-instant events).
        match other.at.cmp(&self.at) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let e1 = ScheduledEvent::new(
            Timestamp::from_secs(10),
            SequenceNumber::new(1),
            Event::HelloTick { node: 0 },
        );
        let e2 = ScheduledEvent::new(
            Timestamp::from_secs(5),
            SequenceNumber::new(2),
            Event::HelloTick { node: 0 },
        );

        // e2 has earlier time, so it should be "greater" in min-heap terms.
        assert!(e2 > e1);
    }

    #[test]
    fn test_same_time_sequence_ordering() {
        let e1 = ScheduledEvent::new(
            Timestamp::from_secs(10),
            SequenceNumber::new(1),
            Event::HelloTick { node: 0 },
        );
        let e2 = ScheduledEvent::new(
            Timestamp::from_secs(10),
            SequenceNumber::new(2),
            Event::HelloTick { node: 1 },
        );

        // Same time, e1 was admitted first, so e1 dispatches first.
        assert!(e1 > e2);
    }

    #[test]
    fn test_heap_pops_fifo_at_same_instant() {
        use std::collections::BinaryHeap;

        let mut heap = BinaryHeap::new();
        for seq in 0..4u64 {
            heap.push(ScheduledEvent::new(
                Timestamp::from_secs(1),
                SequenceNumber::new(seq),
                Event::AppTick { node: seq as NodeId },
            ));
        }
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop())
            .map(|e| e.seq.value())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
