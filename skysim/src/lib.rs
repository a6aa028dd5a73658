//! skysim - discrete event simulator for the skymesh FANET stack.
//!
//! This crate provides a deterministic, discrete-event driver for
//! `skymesh` nodes: a shared wireless medium with CSMA/CA-style
//! contention, the virtual-time event loop, metric accounting and
//! observation sinks.
//!
//! # Features
//!
//! - **Discrete event simulation**: no real-time delays, deterministic
//!   ordering via `(time, admission sequence)`
//! - **Shared medium**: carrier sense, random backoff, range-gated
//!   delivery with propagation delay and jitter
//! - **Scenario builder**: pinned positions, static nodes, scripted
//!   moves and Hello muting for protocol tests
//! - **Metrics**: attempted/delivered counts, PDR, mean latency and
//!   path length
//!
//! # Example
//!
//! ```
//! use skysim::scenario::static_pair;
//!
//! // Two static nodes 100 m apart with a 120 m radio range.
//! let mut sim = static_pair(100.0, 120.0, 5.0).build();
//! let result = sim.run();
//! assert!(result.end_time.as_secs_f64() >= 5.0);
//! ```
//!
//! # Architecture
//!
//! The event loop pops the earliest event, advances virtual time and
//! dispatches: periodic per-node ticks call the matching node handler,
//! `TxAttempt` events walk the MAC state machine, `Deliver` events feed
//! receive dispatch. After every handler the simulator drains the
//! node's queued frames into the medium and its side effects into the
//! metrics and the observation sink. Same-instant events run in FIFO
//! admission order, reproducing cooperative-scheduler semantics.

pub mod event;
pub mod medium;
pub mod metrics;
pub mod observe;
pub mod scenario;
pub mod sim;

// Re-export main types
pub use event::{Event, PendingFrame, ScenarioAction, ScheduledEvent, SequenceNumber};
pub use medium::{MacDecision, WirelessMedium};
pub use metrics::{MetricsReport, SimMetrics, SimulationResult};
pub use observe::{MemorySink, PrintSink, Recorded};
pub use scenario::ScenarioBuilder;
pub use sim::Simulation;
