//! Scenario builder for setting up and running simulations.
//!
//! Wraps [`Simulation`] construction with the knobs tests actually
//! turn: pinned positions, static nodes, short horizons and scripted
//! actions. Random placement from the seed remains the default.

use skymesh::config::SimConfig;
use skymesh::time::Timestamp;
use skymesh::types::{NodeId, Position};

use crate::event::ScenarioAction;
use crate::sim::Simulation;

/// Builder for simulation scenarios.
pub struct ScenarioBuilder {
    cfg: SimConfig,
    positions: Option<Vec<Position>>,
    actions: Vec<(Timestamp, ScenarioAction)>,
}

impl ScenarioBuilder {
    /// Start from the default configuration with `num_nodes` nodes.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            cfg: SimConfig {
                num_nodes,
                ..SimConfig::default()
            },
            positions: None,
            actions: Vec::new(),
        }
    }

    /// Start from an explicit configuration.
    pub fn from_config(cfg: SimConfig) -> Self {
        Self {
            cfg,
            positions: None,
            actions: Vec::new(),
        }
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Set the world rectangle.
    pub fn with_world(mut self, width: f64, height: f64) -> Self {
        self.cfg.world_size = (width, height);
        self
    }

    /// Set the delivery radius.
    pub fn with_comm_range(mut self, range: f64) -> Self {
        self.cfg.comm_range = range;
        self
    }

    /// Set the simulated duration in seconds.
    pub fn with_sim_time(mut self, secs: f64) -> Self {
        self.cfg.sim_time_s = secs;
        self
    }

    /// Pin nodes in place: zero speed, zero dwell.
    pub fn static_nodes(mut self) -> Self {
        self.cfg.speed_mps = (0.0, 0.0);
        self.cfg.waypoint_pause_s = (0.0, 0.0);
        self
    }

    /// Emit periodic snapshots.
    pub fn with_snapshot_period(mut self, secs: f64) -> Self {
        self.cfg.snapshot_period_s = Some(secs);
        self
    }

    /// Pin initial positions; the list length must match the node count.
    pub fn at_positions(mut self, positions: &[(f64, f64)]) -> Self {
        self.positions = Some(
            positions
                .iter()
                .map(|&(x, y)| Position::new(x, y))
                .collect(),
        );
        self
    }

    /// Schedule a scripted action.
    pub fn action_at(mut self, at: Timestamp, action: ScenarioAction) -> Self {
        self.actions.push((at, action));
        self
    }

    /// Build the simulation.
    ///
    /// Panics on an invalid configuration or a position-count mismatch;
    /// scenarios are test fixtures, not user input.
    pub fn build(self) -> Simulation {
        let mut sim = Simulation::new(self.cfg).expect("scenario config must be valid");
        if let Some(positions) = self.positions {
            assert_eq!(
                positions.len(),
                sim.num_nodes(),
                "one pinned position per node"
            );
            for (id, pos) in positions.into_iter().enumerate() {
                sim.place_node(id as NodeId, pos);
            }
        }
        for (at, action) in self.actions {
            sim.schedule_action(at, action);
        }
        sim
    }
}

/// Two static nodes on a horizontal line, `gap` meters apart.
pub fn static_pair(gap: f64, comm_range: f64, sim_time_s: f64) -> ScenarioBuilder {
    ScenarioBuilder::new(2)
        .static_nodes()
        .with_world(200.0_f64.max(gap * 2.0), 200.0)
        .with_comm_range(comm_range)
        .with_sim_time(sim_time_s)
        .at_positions(&[(50.0, 100.0), (50.0 + gap, 100.0)])
}

/// Static nodes on a horizontal line with uniform spacing.
pub fn line(count: usize, spacing: f64, comm_range: f64, sim_time_s: f64) -> ScenarioBuilder {
    let positions: Vec<(f64, f64)> = (0..count).map(|i| (i as f64 * spacing, 0.0)).collect();
    let width = spacing * count as f64;
    ScenarioBuilder::new(count)
        .static_nodes()
        .with_world(width.max(1.0), 200.0)
        .with_comm_range(comm_range)
        .with_sim_time(sim_time_s)
        .at_positions(&positions)
}
