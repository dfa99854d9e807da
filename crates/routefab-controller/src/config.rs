use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use routefab_core::{NodeKind, NodeName};
use routefab_routing::{Algorithm, TopologyError, TopologyGraph};

/// Configuration for a controller instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Address the registration listener binds to.
    pub listen_addr: String,
    /// Shortest-path algorithm, validated at construction of the engine.
    pub algorithm: Algorithm,
    /// Seconds a node stays in the topology without re-registering.
    pub liveness_ttl_secs: u64,
    /// Period of the background recomputation, in seconds.
    pub recompute_period_secs: u64,
    /// Upper bound on concurrently served registration connections.
    pub max_connections: usize,
    /// Deadline for each socket read/write, in milliseconds.
    pub io_timeout_ms: u64,
    /// File the routing-table snapshot is persisted to after every
    /// successful recomputation.
    pub snapshot_path: PathBuf,
    /// Topology the controller starts with.
    pub topology: TopologySeed,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:4700".into(),
            algorithm: Algorithm::Dijkstra,
            liveness_ttl_secs: 30,
            recompute_period_secs: 30,
            max_connections: 64,
            io_timeout_ms: 5_000,
            snapshot_path: PathBuf::from("routing_tables.json"),
            topology: TopologySeed::default(),
        }
    }
}

impl ControllerConfig {
    pub fn liveness_ttl(&self) -> Duration {
        Duration::from_secs(self.liveness_ttl_secs)
    }

    pub fn recompute_period(&self) -> Duration {
        Duration::from_secs(self.recompute_period_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

/// Declarative starting topology: the nodes and links the fabric is born
/// with. Further membership changes come from admission and eviction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologySeed {
    #[serde(default)]
    pub nodes: Vec<SeedNode>,
    #[serde(default)]
    pub links: Vec<SeedLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedNode {
    pub id: u32,
    pub name: NodeName,
    #[serde(default)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedLink {
    pub source: u32,
    pub destination: u32,
    pub bandwidth: f64,
}

impl TopologySeed {
    /// Build a graph from this seed. Fails on the first invalid entry,
    /// leaving nothing half-applied for the caller to use.
    pub fn build(&self) -> Result<TopologyGraph, TopologyError> {
        let mut graph = TopologyGraph::new();
        for node in &self.nodes {
            graph.add_node(node.id, node.name.clone(), node.kind)?;
        }
        for link in &self.links {
            graph.add_link(link.source, link.destination, link.bandwidth)?;
        }
        Ok(graph)
    }
}
