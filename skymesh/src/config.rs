//! Simulation configuration record.
//!
//! [`SimConfig`] enumerates every tunable explicitly. Deserialization
//! rejects unknown keys; [`SimConfig::validate`] rejects inconsistent
//! values before any simulation is built. Defaults model a small
//! Wi-Fi/ISM-range swarm in a 1000 x 700 m world.

use core::fmt;

use serde::Deserialize;

use crate::time::Duration;

/// Keyed configuration record for one simulation run.
///
/// All `*_s` fields are in seconds; distances and the world rectangle
/// are in meters; speeds are in meters per second.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimConfig {
    /// Node count, fixed at build time.
    pub num_nodes: usize,
    /// World rectangle (width, height).
    pub world_size: (f64, f64),
    /// Delivery radius of the shared medium.
    pub comm_range: f64,
    /// Neighbor beacon period.
    pub hello_period_s: f64,
    /// Distance-vector advertisement period.
    pub dv_period_s: f64,
    /// Handshake initiation period.
    pub app_send_period_s: f64,
    /// Time without a Hello before a neighbor is aged out.
    pub neighbor_timeout_s: f64,
    /// Mobility tick.
    pub mobility_step_s: f64,
    /// Waypoint speed range `[v_min, v_max]`.
    pub speed_mps: (f64, f64),
    /// Dwell range at a reached waypoint `[p_min, p_max]`.
    pub waypoint_pause_s: (f64, f64),
    /// Minimum random backoff before a transmission.
    pub mac_min_backoff_s: f64,
    /// Maximum random backoff before a transmission.
    pub mac_max_backoff_s: f64,
    /// On-air duration of one frame; the medium stays reserved this long.
    pub mac_tx_duration_s: f64,
    /// Fixed per-hop delay component.
    pub channel_base_delay_s: f64,
    /// Per-receiver jitter range.
    pub channel_jitter_s: (f64, f64),
    /// Propagation speed for the distance-dependent delay term.
    pub prop_speed_mps: f64,
    /// Clamp on the distance-dependent delay term.
    pub max_per_hop_delay_s: f64,
    /// Size of the random payload carried by each DataMsg.
    pub data_payload_bytes: usize,
    /// Total simulated time.
    pub sim_time_s: f64,
    /// Master RNG seed; every stream in the run derives from it.
    pub seed: u64,
    /// Log routing-table changes through the `log` facade.
    pub log_dv_changes: bool,
    /// Period of `on_snapshot` sink calls; `None` disables periodic
    /// snapshots (a final one is always emitted).
    pub snapshot_period_s: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_nodes: 4,
            world_size: (1000.0, 700.0),
            comm_range: 260.0,
            hello_period_s: 0.6,
            dv_period_s: 1.2,
            app_send_period_s: 1.6,
            neighbor_timeout_s: 2.0,
            mobility_step_s: 0.2,
            speed_mps: (10.0, 22.0),
            waypoint_pause_s: (0.0, 0.4),
            mac_min_backoff_s: 0.001,
            mac_max_backoff_s: 0.006,
            mac_tx_duration_s: 0.003,
            channel_base_delay_s: 0.001,
            channel_jitter_s: (0.002, 0.020),
            prop_speed_mps: 3.0e8,
            max_per_hop_delay_s: 0.015,
            data_payload_bytes: 32,
            sim_time_s: 120.0,
            seed: 42,
            log_dv_changes: false,
            snapshot_period_s: None,
        }
    }
}

impl SimConfig {
    /// Check the record for internal consistency.
    ///
    /// Called by the simulator before anything is built; a failure here
    /// means no simulation runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_nodes < 1 {
            return Err(ConfigError::NodeCount(self.num_nodes));
        }
        for (name, value) in [
            ("world_size.w", self.world_size.0),
            ("world_size.h", self.world_size.1),
            ("comm_range", self.comm_range),
            ("hello_period_s", self.hello_period_s),
            ("dv_period_s", self.dv_period_s),
            ("app_send_period_s", self.app_send_period_s),
            ("neighbor_timeout_s", self.neighbor_timeout_s),
            ("mobility_step_s", self.mobility_step_s),
            ("prop_speed_mps", self.prop_speed_mps),
            ("sim_time_s", self.sim_time_s),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        for (name, value) in [
            ("speed_mps.min", self.speed_mps.0),
            ("waypoint_pause_s.min", self.waypoint_pause_s.0),
            ("mac_min_backoff_s", self.mac_min_backoff_s),
            ("mac_tx_duration_s", self.mac_tx_duration_s),
            ("channel_base_delay_s", self.channel_base_delay_s),
            ("channel_jitter_s.min", self.channel_jitter_s.0),
            ("max_per_hop_delay_s", self.max_per_hop_delay_s),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { name, value });
            }
        }
        for (name, lo, hi) in [
            ("speed_mps", self.speed_mps.0, self.speed_mps.1),
            (
                "waypoint_pause_s",
                self.waypoint_pause_s.0,
                self.waypoint_pause_s.1,
            ),
            (
                "mac_backoff_s",
                self.mac_min_backoff_s,
                self.mac_max_backoff_s,
            ),
            (
                "channel_jitter_s",
                self.channel_jitter_s.0,
                self.channel_jitter_s.1,
            ),
        ] {
            if lo > hi {
                return Err(ConfigError::InvertedRange { name, lo, hi });
            }
        }
        if let Some(period) = self.snapshot_period_s {
            if !(period > 0.0) {
                return Err(ConfigError::NotPositive {
                    name: "snapshot_period_s",
                    value: period,
                });
            }
        }
        if self.num_nodes > usize::from(crate::types::NodeId::MAX) + 1 {
            return Err(ConfigError::NodeCount(self.num_nodes));
        }
        Ok(())
    }

    /// Neighbor beacon period.
    pub fn hello_period(&self) -> Duration {
        Duration::from_secs_f64(self.hello_period_s)
    }

    /// Distance-vector advertisement period.
    pub fn dv_period(&self) -> Duration {
        Duration::from_secs_f64(self.dv_period_s)
    }

    /// Handshake initiation period.
    pub fn app_send_period(&self) -> Duration {
        Duration::from_secs_f64(self.app_send_period_s)
    }

    /// Neighbor aging timeout.
    pub fn neighbor_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.neighbor_timeout_s)
    }

    /// Aging task period: half the timeout, so a silent neighbor is
    /// detected within one extra check interval.
    pub fn age_check_period(&self) -> Duration {
        self.neighbor_timeout().div(2)
    }

    /// Mobility tick.
    pub fn mobility_step(&self) -> Duration {
        Duration::from_secs_f64(self.mobility_step_s)
    }

    /// On-air frame duration.
    pub fn mac_tx_duration(&self) -> Duration {
        Duration::from_secs_f64(self.mac_tx_duration_s)
    }

    /// Total simulated time.
    pub fn sim_time(&self) -> Duration {
        Duration::from_secs_f64(self.sim_time_s)
    }

    /// Periodic snapshot interval, if enabled.
    pub fn snapshot_period(&self) -> Option<Duration> {
        self.snapshot_period_s.map(Duration::from_secs_f64)
    }

    /// Initial TTL for session and data frames: the node count, which
    /// bounds any simple-path diameter.
    pub fn initial_ttl(&self) -> u8 {
        self.num_nodes.min(usize::from(u8::MAX)) as u8
    }
}

/// Configuration rejection reasons.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Node count outside `[1, NodeId::MAX + 1]`.
    NodeCount(usize),
    /// A value that must be strictly positive was not.
    NotPositive { name: &'static str, value: f64 },
    /// A value that must be non-negative was not.
    Negative { name: &'static str, value: f64 },
    /// A `(min, max)` pair with `min > max`.
    InvertedRange {
        name: &'static str,
        lo: f64,
        hi: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NodeCount(n) => write!(f, "invalid node count {n}"),
            ConfigError::NotPositive { name, value } => {
                write!(f, "{name} must be > 0, got {value}")
            }
            ConfigError::Negative { name, value } => {
                write!(f, "{name} must be >= 0, got {value}")
            }
            ConfigError::InvertedRange { name, lo, hi } => {
                write!(f, "{name} range is inverted: ({lo}, {hi})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zero_nodes() {
        let cfg = SimConfig {
            num_nodes: 0,
            ..SimConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NodeCount(0)));
    }

    #[test]
    fn test_rejects_inverted_speed_range() {
        let cfg = SimConfig {
            speed_mps: (10.0, 5.0),
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvertedRange {
                name: "speed_mps",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_inverted_backoff() {
        let cfg = SimConfig {
            mac_min_backoff_s: 0.01,
            mac_max_backoff_s: 0.001,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvertedRange {
                name: "mac_backoff_s",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_negative_backoff() {
        let cfg = SimConfig {
            mac_min_backoff_s: -0.001,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Negative { .. })));
    }

    #[test]
    fn test_zero_speed_is_valid() {
        // Static scenarios pin nodes by zeroing the speed range.
        let cfg = SimConfig {
            speed_mps: (0.0, 0.0),
            ..SimConfig::default()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_initial_ttl_tracks_node_count() {
        let cfg = SimConfig {
            num_nodes: 6,
            ..SimConfig::default()
        };
        assert_eq!(cfg.initial_ttl(), 6);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = serde_json::from_str::<SimConfig>(r#"{"num_nodes": 2, "bogus": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: SimConfig = serde_json::from_str(r#"{"num_nodes": 7, "seed": 9}"#)
            .expect("partial config should deserialize");
        assert_eq!(cfg.num_nodes, 7);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.comm_range, 260.0);
    }
}
