//! Observation sink interface.
//!
//! The core never depends on a renderer; it pushes path traces,
//! topology events and periodic world snapshots through this trait.
//! Implementations must return promptly — the core never waits on a
//! sink.

use crate::routing::RoutingTable;
use crate::time::{Duration, Timestamp};
use crate::types::{Cost, NodeId, Position};

/// One routing-table row as exposed to observers.
#[derive(Debug, Clone, Copy)]
pub struct RouteView {
    pub dest: NodeId,
    pub cost: Cost,
    pub next_hop: NodeId,
    /// Set when the row changed since the previous snapshot.
    pub changed: bool,
}

/// Full world state at one instant, indexed by node id.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub time: Timestamp,
    pub positions: Vec<Position>,
    /// Sorted neighbor ids per node.
    pub neighbor_sets: Vec<Vec<NodeId>>,
    /// Sorted routing rows per node.
    pub routing_tables: Vec<Vec<RouteView>>,
}

/// Receiver for structured observations from the simulation core.
pub trait ObservationSink: Send {
    /// A DataMsg reached its destination over `path`.
    fn on_path(&mut self, path: &[NodeId], time: Timestamp);

    /// `node` gained (`added`) or lost a neighbor.
    fn on_neighbor_change(&mut self, node: NodeId, neighbor: NodeId, added: bool);

    /// Periodic (and final) world state.
    fn on_snapshot(&mut self, snapshot: &WorldSnapshot);
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl ObservationSink for NullSink {
    fn on_path(&mut self, _path: &[NodeId], _time: Timestamp) {}
    fn on_neighbor_change(&mut self, _node: NodeId, _neighbor: NodeId, _added: bool) {}
    fn on_snapshot(&mut self, _snapshot: &WorldSnapshot) {}
}

/// Side effects a node hands back to its driver after a handler runs.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// A new neighbor was learned from a Hello.
    NeighborUp(NodeId),
    /// A neighbor was aged out.
    NeighborDown(NodeId),
    /// A DataMsg was emitted at this source (counts as attempted).
    DataOriginated { dst: NodeId, session_id: u64 },
    /// A DataMsg arrived at this destination. `path` includes both
    /// endpoints.
    DataDelivered {
        path: Vec<NodeId>,
        latency: Duration,
    },
}

/// Build a [`RouteView`] list from a routing table, sorted by dest.
pub fn route_views(table: &RoutingTable) -> Vec<RouteView> {
    table
        .entries_sorted()
        .into_iter()
        .map(|(dest, e)| RouteView {
            dest,
            cost: e.cost,
            next_hop: e.next_hop,
            changed: e.changed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;

    #[test]
    fn test_route_views_sorted() {
        let mut rt = RoutingTable::new(0);
        rt.ensure_direct(3, Timestamp::ZERO, false);
        rt.ensure_direct(1, Timestamp::ZERO, false);
        let views = route_views(&rt);
        let dests: Vec<NodeId> = views.iter().map(|v| v.dest).collect();
        assert_eq!(dests, vec![0, 1, 3]);
    }
}
