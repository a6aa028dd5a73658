//! Shared wireless medium with a simplified CSMA/CA MAC.
//!
//! The medium is one process-wide resource: a `busy_until` reservation
//! plus an RNG stream for backoff and jitter. It does not own the event
//! queue; [`WirelessMedium::attempt`] returns a decision and the event
//! loop schedules the resulting retries or deliveries.
//!
//! Frame lifecycle: a queued frame gets its first attempt at
//! `max(now, busy_until) + backoff`. When the attempt fires and the
//! medium is free, the frame is admitted — the reservation extends by
//! the TX duration and every in-range receiver gets an independent
//! delivery time. When the medium was re-reserved during the backoff,
//! the frame retries after the new `busy_until`, up to
//! [`MAC_MAX_ATTEMPTS`]; then it is silently dropped.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use skymesh::config::SimConfig;
use skymesh::time::{Duration, Timestamp};
use skymesh::types::{uniform, NodeId, Position, MAC_MAX_ATTEMPTS};

/// Seed perturbation for the medium's RNG stream, keeping it disjoint
/// from the per-node streams.
const MEDIUM_SEED_XOR: u64 = 0x5EA1_AB1E;

/// Outcome of one carrier-sense/backoff attempt.
#[derive(Debug, Clone)]
pub enum MacDecision {
    /// Frame admitted; deliver to each `(receiver, at)` pair.
    Admit { deliveries: Vec<(NodeId, Timestamp)> },
    /// Medium was re-reserved during backoff; retry at the given time.
    Retry { at: Timestamp },
    /// Attempt cap exhausted; the frame is lost.
    Drop,
}

/// The shared medium (MAC + PHY).
pub struct WirelessMedium {
    cfg: Arc<SimConfig>,
    rng: ChaCha8Rng,
    busy_until: Timestamp,
    /// Admission times, in order. Used by contention assertions and the
    /// frames-on-air counter.
    admissions: Vec<Timestamp>,
    /// Frames lost to backoff-cap exhaustion.
    dropped: u64,
}

impl WirelessMedium {
    pub fn new(cfg: Arc<SimConfig>) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed ^ MEDIUM_SEED_XOR);
        Self {
            cfg,
            rng,
            busy_until: Timestamp::ZERO,
            admissions: Vec::new(),
            dropped: 0,
        }
    }

    /// End of the current reservation.
    pub fn busy_until(&self) -> Timestamp {
        self.busy_until
    }

    /// All admission times so far.
    pub fn admissions(&self) -> &[Timestamp] {
        &self.admissions
    }

    /// Frames dropped at the MAC layer.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// When a frame queued at `now` should make its first attempt:
    /// after the current reservation plus a fresh random backoff.
    pub fn first_attempt_at(&mut self, now: Timestamp) -> Timestamp {
        let idle_from = self.busy_until.max(now);
        idle_from.saturating_add(self.backoff())
    }

    /// Run one attempt for a frame whose backoff just elapsed.
    ///
    /// `positions` is indexed by node id and snapshotted by the caller
    /// at the attempt instant, per the broadcast contract.
    pub fn attempt(
        &mut self,
        sender: NodeId,
        attempt: u8,
        now: Timestamp,
        positions: &[Position],
    ) -> MacDecision {
        if now < self.busy_until {
            // Lost the race: someone reserved the medium during our backoff.
            if attempt >= MAC_MAX_ATTEMPTS {
                self.dropped += 1;
                return MacDecision::Drop;
            }
            return MacDecision::Retry {
                at: self.busy_until.saturating_add(self.backoff()),
            };
        }

        // Reserve the medium for the on-air duration.
        self.busy_until = now.saturating_add(self.cfg.mac_tx_duration());
        self.admissions.push(now);

        let sender_pos = positions[usize::from(sender)];
        let mut deliveries = Vec::new();
        for (idx, pos) in positions.iter().enumerate() {
            let receiver = idx as NodeId;
            if receiver == sender {
                continue;
            }
            let dist = sender_pos.distance_to(*pos);
            if dist > self.cfg.comm_range {
                continue;
            }
            let at = self
                .busy_until
                .saturating_add(self.propagation_delay(dist));
            deliveries.push((receiver, at));
        }
        MacDecision::Admit { deliveries }
    }

    fn backoff(&mut self) -> Duration {
        Duration::from_secs_f64(uniform(
            &mut self.rng,
            self.cfg.mac_min_backoff_s,
            self.cfg.mac_max_backoff_s,
        ))
    }

    /// Per-receiver delay: fixed base + clamped distance term + jitter.
    fn propagation_delay(&mut self, dist: f64) -> Duration {
        let dist_delay = (dist / self.cfg.prop_speed_mps).min(self.cfg.max_per_hop_delay_s);
        let jitter = uniform(
            &mut self.rng,
            self.cfg.channel_jitter_s.0,
            self.cfg.channel_jitter_s.1,
        );
        Duration::from_secs_f64(self.cfg.channel_base_delay_s + dist_delay + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn medium_with(range: f64) -> WirelessMedium {
        WirelessMedium::new(Arc::new(SimConfig {
            comm_range: range,
            ..SimConfig::default()
        }))
    }

    #[test]
    fn test_admit_reserves_medium() {
        let mut medium = medium_with(100.0);
        let positions = [Position::new(0.0, 0.0), Position::new(50.0, 0.0)];
        let now = Timestamp::from_millis(10);

        let decision = medium.attempt(0, 1, now, &positions);
        let MacDecision::Admit { deliveries } = decision else {
            panic!("free medium should admit");
        };
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, 1);
        assert_eq!(medium.busy_until(), now + SimConfig::default().mac_tx_duration());

        // Deliveries land strictly after the on-air time.
        assert!(deliveries[0].1 > medium.busy_until());
    }

    #[test]
    fn test_out_of_range_receivers_excluded() {
        let mut medium = medium_with(40.0);
        let positions = [
            Position::new(0.0, 0.0),
            Position::new(30.0, 0.0),
            Position::new(90.0, 0.0),
        ];
        let MacDecision::Admit { deliveries } =
            medium.attempt(0, 1, Timestamp::ZERO, &positions)
        else {
            panic!("free medium should admit");
        };
        let receivers: Vec<NodeId> = deliveries.iter().map(|d| d.0).collect();
        assert_eq!(receivers, vec![1]);
    }

    #[test]
    fn test_busy_medium_retries_then_drops() {
        let mut medium = medium_with(100.0);
        let positions = [Position::new(0.0, 0.0), Position::new(10.0, 0.0)];

        // Reserve the medium.
        let MacDecision::Admit { .. } = medium.attempt(0, 1, Timestamp::ZERO, &positions) else {
            panic!("free medium should admit");
        };
        let busy_until = medium.busy_until();

        // An attempt inside the reservation retries after it.
        let inside = Timestamp::from_nanos(1);
        match medium.attempt(1, 1, inside, &positions) {
            MacDecision::Retry { at } => assert!(at >= busy_until),
            other => panic!("expected retry, got {other:?}"),
        }

        // At the attempt cap the frame is dropped.
        match medium.attempt(1, MAC_MAX_ATTEMPTS, inside, &positions) {
            MacDecision::Drop => {}
            other => panic!("expected drop, got {other:?}"),
        }
        assert_eq!(medium.dropped(), 1);
    }

    #[test]
    fn test_first_attempt_waits_for_reservation() {
        let mut medium = medium_with(100.0);
        let positions = [Position::new(0.0, 0.0), Position::new(10.0, 0.0)];
        medium.attempt(0, 1, Timestamp::ZERO, &positions);

        let attempt_at = medium.first_attempt_at(Timestamp::ZERO);
        assert!(attempt_at >= medium.busy_until());
    }

    #[test]
    fn test_delay_clamped_by_max_per_hop() {
        let cfg = SimConfig {
            comm_range: 1.0e9,
            prop_speed_mps: 1.0, // 1 m/s: distance term would be huge
            channel_jitter_s: (0.0, 0.0),
            channel_base_delay_s: 0.001,
            max_per_hop_delay_s: 0.015,
            ..SimConfig::default()
        };
        let tx = cfg.mac_tx_duration();
        let mut medium = WirelessMedium::new(Arc::new(cfg));
        let positions = [Position::new(0.0, 0.0), Position::new(1000.0, 0.0)];
        let MacDecision::Admit { deliveries } =
            medium.attempt(0, 1, Timestamp::ZERO, &positions)
        else {
            panic!("free medium should admit");
        };
        let delay = deliveries[0].1 - (Timestamp::ZERO + tx);
        assert_eq!(delay, Duration::from_secs_f64(0.016));
    }

    #[test]
    fn test_deterministic_backoff_stream() {
        let mut a = medium_with(100.0);
        let mut b = medium_with(100.0);
        for _ in 0..10 {
            assert_eq!(
                a.first_attempt_at(Timestamp::ZERO),
                b.first_attempt_at(Timestamp::ZERO)
            );
        }
    }
}
