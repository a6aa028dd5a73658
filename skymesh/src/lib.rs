//! skymesh - protocol stack for a flying ad-hoc network emulator.
//!
//! A FANET node runs six cooperative tasks: mobility, hello beaconing,
//! distance-vector advertisement, application handshake, receive
//! dispatch and neighbor aging. This crate implements all of them as
//! synchronous state-machine steps over an explicit virtual clock,
//! leaving scheduling and the shared medium to a driver (see the
//! `skysim` crate).
//!
//! # Key Properties
//!
//! - Neighbors are learned from Hello beacons and aged out after a
//!   configurable silence
//! - Routes are hop-count distance vectors with split horizon and
//!   poisoned reverse; withdrawals propagate before being collected
//! - Application data flows only after a SessionReq/SessionAck
//!   handshake proves mutual reachability
//! - All randomness comes from seeded per-node streams, so identical
//!   seeds reproduce identical behavior
//!
//! # Module Structure
//!
//! - [`time`] - Virtual `Timestamp`/`Duration` newtypes
//! - [`types`] - Node ids, positions, cost constants
//! - [`messages`] - Envelope and the five payload kinds
//! - [`config`] - The validated configuration record
//! - [`routing`] - Neighbor table and distance-vector engine
//! - [`mobility`] - Random-waypoint model
//! - [`session`] - Handshake state and dedup sets
//! - [`observe`] - Observation sink interface
//! - [`node`] - The per-node state machine tying it together

pub mod config;
pub mod messages;
pub mod mobility;
pub mod node;
pub mod observe;
pub mod routing;
pub mod session;
pub mod time;
pub mod types;

// Re-export main types at crate root
pub use config::{ConfigError, SimConfig};
pub use messages::{DataMsg, DvEntry, DvUpdate, Envelope, Hello, Payload, SessionAck, SessionReq};
pub use node::Node;
pub use observe::{NodeEvent, NullSink, ObservationSink, WorldSnapshot};
pub use routing::{NeighborTable, RoutingTable};
pub use time::{Duration, Timestamp};
pub use types::{Cost, NodeId, Position, COST_INFINITE, MAC_MAX_ATTEMPTS, MAX_HOPS};
