//! Topology maintenance and shortest-path computation.
//!
//! This crate provides:
//! - [`TopologyGraph`], the weighted undirected graph of named nodes, with
//!   inverse-bandwidth edge weights.
//! - [`ShortestPathEngine`], all-pairs and single-source shortest paths with
//!   a selectable algorithm ([`Algorithm::Dijkstra`] or
//!   [`Algorithm::BellmanFord`] with negative-cycle detection).
//! - [`RoutingTable`] and [`RoutingTableStore`], the per-source path map and
//!   its atomically swappable published snapshot.

pub mod engine;
pub mod error;
pub mod graph;
pub mod table;

pub use engine::{path_cost, Algorithm, ShortestPathEngine};
pub use error::{RoutingError, TopologyError};
pub use graph::TopologyGraph;
pub use table::{PathEntry, RoutingTable, RoutingTableStore, TableRow};
