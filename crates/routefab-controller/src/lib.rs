//! Routefab controller, the central authority of the fabric.
//!
//! The controller owns the topology graph, recomputes all-pairs shortest
//! paths periodically and after every liveness-driven mutation, publishes the
//! result through an atomically swapped [`routefab_routing::RoutingTableStore`],
//! and serves each registering node its own table row over length-framed JSON.

pub mod config;
pub mod error;
pub mod liveness;
pub mod service;
pub mod snapshot;

pub use config::{ControllerConfig, SeedLink, SeedNode, TopologySeed};
pub use error::{ControllerError, SnapshotError};
pub use liveness::LivenessTracker;
pub use service::Controller;
pub use snapshot::Snapshot;
