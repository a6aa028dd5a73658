//! Random-waypoint mobility model.
//!
//! Each node keeps a current target and speed. On every mobility tick
//! the position advances toward the target by `speed * dt`, clamped to
//! the world rectangle. Reaching the target (within one step) starts a
//! uniform random pause; when the pause ends a new target and speed
//! are sampled.

use rand::Rng;

use crate::time::{Duration, Timestamp};
use crate::types::{uniform, Position};

/// Waypoint state for one node.
#[derive(Debug, Clone)]
pub struct RandomWaypoint {
    world: (f64, f64),
    speed_range: (f64, f64),
    pause_range: (f64, f64),
    target: Position,
    speed: f64,
    pause_until: Option<Timestamp>,
}

impl RandomWaypoint {
    /// Sample an initial target and speed.
    pub fn new(
        rng: &mut impl Rng,
        world: (f64, f64),
        speed_range: (f64, f64),
        pause_range: (f64, f64),
    ) -> Self {
        let target = Self::sample_target(rng, world);
        let speed = uniform(rng, speed_range.0, speed_range.1);
        Self {
            world,
            speed_range,
            pause_range,
            target,
            speed,
            pause_until: None,
        }
    }

    fn sample_target(rng: &mut impl Rng, world: (f64, f64)) -> Position {
        Position::new(uniform(rng, 0.0, world.0), uniform(rng, 0.0, world.1))
    }

    /// Current target waypoint.
    pub fn target(&self) -> Position {
        self.target
    }

    /// Current speed in m/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Whether the node is dwelling at a reached waypoint.
    pub fn is_paused(&self, now: Timestamp) -> bool {
        self.pause_until.is_some_and(|until| now < until)
    }

    /// Advance `pos` by one mobility tick of length `dt` seconds.
    pub fn step(&mut self, pos: &mut Position, dt: f64, now: Timestamp, rng: &mut impl Rng) {
        if let Some(until) = self.pause_until {
            if now < until {
                return;
            }
            // Dwell over: pick the next leg.
            self.pause_until = None;
            self.target = Self::sample_target(rng, self.world);
            self.speed = uniform(rng, self.speed_range.0, self.speed_range.1);
        }

        let dist = pos.distance_to(self.target);
        let step = self.speed * dt;
        if dist <= step {
            // Arrived (within one step): snap and start the dwell.
            *pos = self.target;
            let pause = uniform(rng, self.pause_range.0, self.pause_range.1);
            self.pause_until = Some(now.saturating_add(Duration::from_secs_f64(pause)));
        } else if step > 0.0 {
            let ratio = step / dist;
            pos.x += (self.target.x - pos.x) * ratio;
            pos.y += (self.target.y - pos.y) * ratio;
        }
        pos.clamp_to(self.world);
    }
}
