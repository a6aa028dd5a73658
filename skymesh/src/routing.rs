//! Neighbor table and distance-vector routing engine.
//!
//! Each node owns one [`NeighborTable`] (refreshed by Hello beacons,
//! drained by the aging task) and one [`RoutingTable`] (relaxed by DV
//! advertisements). Advertisements carry the advertiser's next hops,
//! and receivers apply split horizon with poisoned reverse on ingress:
//! a route the advertiser forwards through the receiver is treated as
//! infinite. Aging poisons dependent routes before garbage-collecting
//! them, so withdrawals get one advertisement period to propagate.

use hashbrown::HashMap;
use log::debug;

use crate::messages::DvEntry;
use crate::time::{Duration, Timestamp};
use crate::types::{Cost, NodeId, Position, COST_INFINITE, MAX_HOPS};

/// Per-neighbor liveness and last-heard state.
#[derive(Debug, Clone, Copy)]
pub struct NeighborEntry {
    /// Last time a Hello was received from this neighbor.
    pub last_heard: Timestamp,
    /// Position carried by the most recent Hello.
    pub pos: Position,
    /// Sequence number of the most recent Hello.
    pub hello_seq: u32,
}

/// Set of currently-live neighbors, keyed by id.
#[derive(Debug, Default)]
pub struct NeighborTable {
    entries: HashMap<NodeId, NeighborEntry>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a Hello from `id`. Returns true when the neighbor is new.
    pub fn refresh(&mut self, id: NodeId, pos: Position, seq: u32, now: Timestamp) -> bool {
        self.entries
            .insert(
                id,
                NeighborEntry {
                    last_heard: now,
                    pos,
                    hello_seq: seq,
                },
            )
            .is_none()
    }

    /// Whether `id` is currently a live neighbor.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&NeighborEntry> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<NeighborEntry> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Neighbor ids in ascending order.
    ///
    /// Iteration over the map itself is never used where order matters;
    /// schedule- or RNG-affecting loops go through this.
    pub fn ids_sorted(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Neighbors not heard from within `timeout`, in ascending id order.
    pub fn expired(&self, now: Timestamp, timeout: Duration) -> Vec<NodeId> {
        let mut dead: Vec<NodeId> = self
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_sub(e.last_heard) > timeout)
            .map(|(&id, _)| id)
            .collect();
        dead.sort_unstable();
        dead
    }
}

/// One routing-table entry.
#[derive(Debug, Clone, Copy)]
pub struct RouteEntry {
    /// Hop count; [`COST_INFINITE`] marks a poisoned (withdrawn) route.
    pub cost: Cost,
    /// Forwarding neighbor; the owner id itself for the self entry.
    pub next_hop: NodeId,
    /// Last install, refresh or poison time.
    pub last_update: Timestamp,
    /// Set on any change; cleared after one reporting period so the
    /// visualizer can highlight fresh rows.
    pub changed: bool,
}

/// Distance-vector routing table for one node.
#[derive(Debug)]
pub struct RoutingTable {
    owner: NodeId,
    routes: HashMap<NodeId, RouteEntry>,
}

impl RoutingTable {
    /// Create a table holding only the self entry `(0, owner)`.
    pub fn new(owner: NodeId) -> Self {
        let mut routes = HashMap::new();
        routes.insert(
            owner,
            RouteEntry {
                cost: 0,
                next_hop: owner,
                last_update: Timestamp::ZERO,
                changed: false,
            },
        );
        Self { owner, routes }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Install or refresh the one-hop route to a heard neighbor.
    ///
    /// Idempotent when a direct route already exists; the entry's
    /// `last_update` is still refreshed.
    pub fn ensure_direct(&mut self, neighbor: NodeId, now: Timestamp, log_changes: bool) {
        let entry = self.routes.entry(neighbor).or_insert(RouteEntry {
            cost: COST_INFINITE,
            next_hop: neighbor,
            last_update: now,
            changed: true,
        });
        if entry.cost > 1 {
            if log_changes {
                debug!("[dv {}] direct route to {neighbor}", self.owner);
            }
            entry.cost = 1;
            entry.next_hop = neighbor;
            entry.changed = true;
        }
        entry.last_update = now;
    }

    /// Bellman-Ford relaxation against an advertised vector.
    ///
    /// Split horizon with poisoned reverse is applied on ingress: an
    /// advertised route whose next hop is this table's owner counts as
    /// infinite. The candidate for anything else is `cost + 1` via the
    /// advertiser, infinite above [`MAX_HOPS`]. An entry is replaced
    /// when the candidate is strictly better, or when it comes from the
    /// entry's current next hop (including increases and withdrawals),
    /// or on an equal-cost tie whose incumbent next hop is no longer a
    /// live neighbor.
    pub fn relax(
        &mut self,
        from: NodeId,
        vector: &[DvEntry],
        neighbors: &NeighborTable,
        now: Timestamp,
        log_changes: bool,
    ) {
        for advert in vector {
            let DvEntry {
                dest,
                cost,
                next_hop,
            } = *advert;
            if dest == self.owner {
                continue;
            }
            let effective = if next_hop == self.owner {
                COST_INFINITE
            } else {
                cost
            };
            let mut candidate = effective.saturating_add(1);
            if candidate > MAX_HOPS {
                candidate = COST_INFINITE;
            }

            match self.routes.get_mut(&dest) {
                None => {
                    // A withdrawal for an unknown destination installs
                    // nothing; there is no state to poison.
                    if candidate < COST_INFINITE {
                        if log_changes {
                            debug!(
                                "[dv {}] learned {dest} via {from} cost {candidate}",
                                self.owner
                            );
                        }
                        self.routes.insert(
                            dest,
                            RouteEntry {
                                cost: candidate,
                                next_hop: from,
                                last_update: now,
                                changed: true,
                            },
                        );
                    }
                }
                Some(entry) => {
                    let better = candidate < entry.cost;
                    let from_current_next_hop =
                        entry.next_hop == from && candidate != entry.cost;
                    let tie_with_dead_incumbent = candidate == entry.cost
                        && candidate < COST_INFINITE
                        && entry.next_hop != from
                        && !neighbors.contains(entry.next_hop);
                    if better || from_current_next_hop || tie_with_dead_incumbent {
                        if log_changes {
                            debug!(
                                "[dv {}] route {dest}: {} via {} -> {candidate} via {from}",
                                self.owner, entry.cost, entry.next_hop
                            );
                        }
                        entry.cost = candidate;
                        entry.next_hop = from;
                        entry.last_update = now;
                        entry.changed = true;
                    } else if entry.next_hop == from && candidate == entry.cost {
                        entry.last_update = now;
                    }
                }
            }
        }
    }

    /// Poison every route whose next hop is in `dead`. Returns the
    /// poisoned destinations in ascending order.
    pub fn poison_via(
        &mut self,
        dead: &[NodeId],
        now: Timestamp,
        log_changes: bool,
    ) -> Vec<NodeId> {
        let mut poisoned = Vec::new();
        for (&dest, entry) in self.routes.iter_mut() {
            if dest == self.owner || entry.cost == COST_INFINITE {
                continue;
            }
            if dead.contains(&entry.next_hop) {
                entry.cost = COST_INFINITE;
                entry.last_update = now;
                entry.changed = true;
                poisoned.push(dest);
            }
        }
        poisoned.sort_unstable();
        if log_changes {
            for dest in &poisoned {
                debug!("[dv {}] poisoned route to {dest}", self.owner);
            }
        }
        poisoned
    }

    /// Drop poisoned entries older than one advertisement period.
    /// Keeping them that long lets the withdrawal propagate first.
    pub fn collect_poisoned(&mut self, now: Timestamp, advert_period: Duration) {
        self.routes.retain(|_, e| {
            e.cost != COST_INFINITE || now.saturating_sub(e.last_update) <= advert_period
        });
    }

    /// Build the advertised vector: every entry except the self one,
    /// true costs plus next hops, sorted by destination. Poisoned
    /// entries are included so withdrawals propagate; receivers apply
    /// the split-horizon rule against the carried next hops.
    pub fn export(&self) -> Vec<DvEntry> {
        let mut vector: Vec<DvEntry> = self
            .routes
            .iter()
            .filter(|(&dest, _)| dest != self.owner)
            .map(|(&dest, e)| DvEntry {
                dest,
                cost: e.cost,
                next_hop: e.next_hop,
            })
            .collect();
        vector.sort_unstable_by_key(|e| e.dest);
        vector
    }

    /// Next-hop lookup: a forwarding neighbor for `dst`, or `None` when
    /// the route is missing, poisoned, or its next hop is no longer a
    /// live neighbor.
    pub fn route(&self, dst: NodeId, neighbors: &NeighborTable) -> Option<NodeId> {
        let entry = self.routes.get(&dst)?;
        if entry.cost < COST_INFINITE && neighbors.contains(entry.next_hop) {
            Some(entry.next_hop)
        } else {
            None
        }
    }

    /// Finite cost to `dst`, if any.
    pub fn cost_to(&self, dst: NodeId) -> Option<Cost> {
        self.routes
            .get(&dst)
            .filter(|e| e.cost < COST_INFINITE)
            .map(|e| e.cost)
    }

    pub fn get(&self, dst: NodeId) -> Option<&RouteEntry> {
        self.routes.get(&dst)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All entries as `(dest, entry)` sorted by destination, for
    /// snapshots and assertions.
    pub fn entries_sorted(&self) -> Vec<(NodeId, RouteEntry)> {
        let mut entries: Vec<(NodeId, RouteEntry)> =
            self.routes.iter().map(|(&d, &e)| (d, e)).collect();
        entries.sort_unstable_by_key(|&(d, _)| d);
        entries
    }

    /// Clear all `changed` flags (after one reporting period).
    pub fn clear_changed(&mut self) {
        for entry in self.routes.values_mut() {
            entry.changed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dv(dest: NodeId, cost: Cost, next_hop: NodeId) -> DvEntry {
        DvEntry {
            dest,
            cost,
            next_hop,
        }
    }

    fn neighbors_of(ids: &[NodeId], now: Timestamp) -> NeighborTable {
        let mut table = NeighborTable::new();
        for &id in ids {
            table.refresh(id, Position::default(), 1, now);
        }
        table
    }

    #[test]
    fn test_self_entry_installed_and_never_exported() {
        let rt = RoutingTable::new(3);
        let entry = rt.get(3).expect("self entry");
        assert_eq!(entry.cost, 0);
        assert_eq!(entry.next_hop, 3);
        assert!(rt.export().is_empty());
    }

    #[test]
    fn test_ensure_direct_idempotent() {
        let mut rt = RoutingTable::new(0);
        rt.ensure_direct(1, Timestamp::from_secs(1), false);
        assert_eq!(rt.cost_to(1), Some(1));

        // Second call keeps the route but refreshes last_update.
        rt.ensure_direct(1, Timestamp::from_secs(5), false);
        let entry = rt.get(1).expect("route");
        assert_eq!(entry.cost, 1);
        assert_eq!(entry.last_update, Timestamp::from_secs(5));
    }

    #[test]
    fn test_ensure_direct_improves_multihop_route() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);
        rt.relax(1, &[dv(2, 1, 2)], &neighbors, Timestamp::ZERO, false);
        assert_eq!(rt.cost_to(2), Some(2));

        rt.ensure_direct(2, Timestamp::from_secs(1), false);
        let entry = rt.get(2).expect("route");
        assert_eq!(entry.cost, 1);
        assert_eq!(entry.next_hop, 2);
    }

    #[test]
    fn test_relax_installs_and_improves() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1, 2], Timestamp::ZERO);

        rt.relax(1, &[dv(5, 3, 4)], &neighbors, Timestamp::ZERO, false);
        assert_eq!(rt.cost_to(5), Some(4));

        // Worse offer from another neighbor: ignored.
        rt.relax(2, &[dv(5, 5, 4)], &neighbors, Timestamp::ZERO, false);
        let entry = rt.get(5).expect("route");
        assert_eq!((entry.cost, entry.next_hop), (4, 1));

        // Better offer: installed.
        rt.relax(2, &[dv(5, 1, 4)], &neighbors, Timestamp::ZERO, false);
        let entry = rt.get(5).expect("route");
        assert_eq!((entry.cost, entry.next_hop), (2, 2));
    }

    #[test]
    fn test_relax_accepts_increase_from_current_next_hop() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);

        rt.relax(1, &[dv(5, 2, 4)], &neighbors, Timestamp::ZERO, false);
        assert_eq!(rt.cost_to(5), Some(3));

        // The path through our next hop got longer; we must follow it.
        rt.relax(1, &[dv(5, 6, 4)], &neighbors, Timestamp::ZERO, false);
        assert_eq!(rt.cost_to(5), Some(7));

        // An explicit withdrawal from the next hop poisons the route.
        rt.relax(
            1,
            &[dv(5, COST_INFINITE, 4)],
            &neighbors,
            Timestamp::ZERO,
            false,
        );
        assert_eq!(rt.cost_to(5), None);
    }

    #[test]
    fn test_ingress_split_horizon() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);

        // The advertiser routes 5 through us: poisoned reverse on
        // ingress, nothing installed.
        rt.relax(1, &[dv(5, 2, 0)], &neighbors, Timestamp::ZERO, false);
        assert!(rt.get(5).is_none());

        // An existing route via the advertiser is withdrawn by it.
        rt.relax(1, &[dv(5, 2, 4)], &neighbors, Timestamp::ZERO, false);
        assert_eq!(rt.cost_to(5), Some(3));
        rt.relax(1, &[dv(5, 2, 0)], &neighbors, Timestamp::ZERO, false);
        assert_eq!(rt.cost_to(5), None);
    }

    #[test]
    fn test_relax_caps_cost_at_max_hops() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);

        rt.relax(1, &[dv(5, MAX_HOPS, 4)], &neighbors, Timestamp::ZERO, false);
        // MAX_HOPS + 1 exceeds the ceiling -> treated as infinite, and
        // an infinite offer for an unknown destination installs nothing.
        assert!(rt.get(5).is_none());

        rt.relax(
            1,
            &[dv(5, MAX_HOPS - 1, 4)],
            &neighbors,
            Timestamp::ZERO,
            false,
        );
        assert_eq!(rt.cost_to(5), Some(MAX_HOPS));
    }

    #[test]
    fn test_relax_skips_own_destination() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);
        rt.relax(1, &[dv(0, 1, 0)], &neighbors, Timestamp::ZERO, false);
        let entry = rt.get(0).expect("self entry");
        assert_eq!((entry.cost, entry.next_hop), (0, 0));
    }

    #[test]
    fn test_equal_cost_hysteresis() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1, 2], Timestamp::ZERO);

        rt.relax(1, &[dv(5, 2, 4)], &neighbors, Timestamp::ZERO, false);
        rt.relax(2, &[dv(5, 2, 4)], &neighbors, Timestamp::ZERO, false);
        // Tie: keep the incumbent.
        assert_eq!(rt.get(5).map(|e| e.next_hop), Some(1));

        // Incumbent next hop dies: the tie now switches.
        let neighbors = neighbors_of(&[2], Timestamp::ZERO);
        rt.relax(2, &[dv(5, 2, 4)], &neighbors, Timestamp::ZERO, false);
        assert_eq!(rt.get(5).map(|e| e.next_hop), Some(2));
    }

    #[test]
    fn test_export_carries_next_hops_and_withdrawals() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1, 2], Timestamp::ZERO);
        rt.ensure_direct(1, Timestamp::ZERO, false);
        rt.ensure_direct(2, Timestamp::ZERO, false);
        rt.relax(1, &[dv(5, 1, 5)], &neighbors, Timestamp::ZERO, false);
        rt.poison_via(&[2], Timestamp::ZERO, false);

        let exported = rt.export();
        assert_eq!(
            exported,
            vec![
                dv(1, 1, 1),
                dv(2, COST_INFINITE, 2),
                dv(5, 2, 1),
            ]
        );
    }

    #[test]
    fn test_poison_and_collect() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);
        rt.ensure_direct(1, Timestamp::ZERO, false);
        rt.relax(1, &[dv(5, 1, 5)], &neighbors, Timestamp::ZERO, false);

        let poisoned = rt.poison_via(&[1], Timestamp::from_secs(3), false);
        assert_eq!(poisoned, vec![1, 5]);
        assert_eq!(rt.cost_to(1), None);
        assert_eq!(rt.cost_to(5), None);

        // Withdrawn entries are still exported for one period...
        let exported = rt.export();
        assert!(exported.contains(&dv(5, COST_INFINITE, 1)));

        // ...then garbage-collected.
        rt.collect_poisoned(Timestamp::from_secs(3), Duration::from_secs(1));
        assert!(rt.get(5).is_some());
        rt.collect_poisoned(Timestamp::from_secs(5), Duration::from_secs(1));
        assert!(rt.get(5).is_none());
        assert!(rt.get(0).is_some(), "self entry survives collection");
    }

    #[test]
    fn test_route_requires_live_neighbor() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);
        rt.ensure_direct(1, Timestamp::ZERO, false);
        rt.relax(1, &[dv(5, 1, 5)], &neighbors, Timestamp::ZERO, false);

        assert_eq!(rt.route(5, &neighbors), Some(1));

        let empty = NeighborTable::new();
        assert_eq!(rt.route(5, &empty), None);
    }

    #[test]
    fn test_costs_stay_bounded() {
        let mut rt = RoutingTable::new(0);
        let neighbors = neighbors_of(&[1], Timestamp::ZERO);
        rt.relax(
            1,
            &[dv(2, 3, 4), dv(3, MAX_HOPS, 4), dv(4, COST_INFINITE - 1, 4)],
            &neighbors,
            Timestamp::ZERO,
            false,
        );
        for (_, entry) in rt.entries_sorted() {
            assert!(entry.cost <= MAX_HOPS || entry.cost == COST_INFINITE);
        }
    }

    #[test]
    fn test_neighbor_table_expiry() {
        let mut table = NeighborTable::new();
        table.refresh(1, Position::default(), 1, Timestamp::from_secs(0));
        table.refresh(2, Position::default(), 1, Timestamp::from_secs(4));

        let dead = table.expired(Timestamp::from_secs(5), Duration::from_secs(2));
        assert_eq!(dead, vec![1]);

        // Refresh rescues a neighbor.
        table.refresh(1, Position::default(), 2, Timestamp::from_secs(5));
        let dead = table.expired(Timestamp::from_secs(5), Duration::from_secs(2));
        assert!(dead.is_empty());
    }

    #[test]
    fn test_changed_flags_cleared() {
        let mut rt = RoutingTable::new(0);
        rt.ensure_direct(1, Timestamp::ZERO, false);
        assert!(rt.get(1).map(|e| e.changed).unwrap_or(false));
        rt.clear_changed();
        assert!(!rt.get(1).map(|e| e.changed).unwrap_or(true));
    }
}
