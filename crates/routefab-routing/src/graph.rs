use std::collections::{BTreeMap, HashMap};

use routefab_core::{Node, NodeKind, NodeName};

use crate::error::TopologyError;

/// The weighted undirected topology graph.
///
/// Nodes are addressed externally by name and internally by id. Every link
/// carries a weight derived from its bandwidth as `1 / bandwidth`, so a
/// higher-bandwidth link is cheaper to traverse. Invariants:
/// - every link endpoint exists in the node set,
/// - node ids and names are unique,
/// - weights are finite (and strictly positive when derived from bandwidth).
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    /// Node records keyed by internal id.
    nodes: HashMap<u32, Node>,
    /// Name -> id index; names are the unique external identifier.
    names: HashMap<NodeName, u32>,
    /// Adjacency keyed by name. BTreeMap values give deterministic
    /// neighbor iteration, which the engine's tie-break rule relies on.
    adjacency: HashMap<NodeName, BTreeMap<NodeName, f64>>,
}

impl TopologyGraph {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node as an isolated vertex. A node whose id is already present
    /// is left untouched (no-op); reusing an existing name under a different
    /// id is rejected because names must stay unique.
    pub fn add_node(
        &mut self,
        id: u32,
        name: NodeName,
        kind: NodeKind,
    ) -> Result<(), TopologyError> {
        if self.nodes.contains_key(&id) {
            return Ok(());
        }
        if let Some(&existing_id) = self.names.get(&name) {
            return Err(TopologyError::DuplicateName { name, existing_id });
        }
        self.names.insert(name.clone(), id);
        self.adjacency.entry(name.clone()).or_default();
        self.nodes.insert(id, Node::new(id, name, kind));
        Ok(())
    }

    /// Add an undirected link between two existing nodes. The edge weight is
    /// derived as `1 / bandwidth`; an existing link between the same pair is
    /// overwritten with the new weight.
    pub fn add_link(
        &mut self,
        source_id: u32,
        destination_id: u32,
        bandwidth: f64,
    ) -> Result<(), TopologyError> {
        if !(bandwidth.is_finite() && bandwidth > 0.0) {
            return Err(TopologyError::InvalidBandwidth { bandwidth });
        }
        self.add_link_with_weight(source_id, destination_id, 1.0 / bandwidth)
    }

    /// Add an undirected link with an explicit weight, bypassing the
    /// inverse-bandwidth derivation. Negative weights are accepted here:
    /// Bellman-Ford supports them as part of its contract even though
    /// bandwidth-derived topologies never produce them.
    pub fn add_link_with_weight(
        &mut self,
        source_id: u32,
        destination_id: u32,
        weight: f64,
    ) -> Result<(), TopologyError> {
        if !weight.is_finite() {
            return Err(TopologyError::InvalidWeight { weight });
        }
        let source = self
            .nodes
            .get(&source_id)
            .ok_or(TopologyError::UnknownEndpoint { id: source_id })?
            .name
            .clone();
        let destination = self
            .nodes
            .get(&destination_id)
            .ok_or(TopologyError::UnknownEndpoint { id: destination_id })?
            .name
            .clone();

        self.adjacency
            .entry(source.clone())
            .or_default()
            .insert(destination.clone(), weight);
        self.adjacency
            .entry(destination)
            .or_default()
            .insert(source, weight);
        Ok(())
    }

    /// Remove a node by name, cascading removal of every incident link.
    pub fn remove_node(&mut self, name: &NodeName) -> Result<Node, TopologyError> {
        let id = self
            .names
            .remove(name)
            .ok_or_else(|| TopologyError::NodeNotFound { name: name.clone() })?;
        let node = self.nodes.remove(&id).ok_or_else(|| TopologyError::NodeNotFound {
            name: name.clone(),
        })?;

        if let Some(neighbors) = self.adjacency.remove(name) {
            for neighbor in neighbors.keys() {
                if let Some(back) = self.adjacency.get_mut(neighbor) {
                    back.remove(name);
                }
            }
        }
        Ok(node)
    }

    /// Remove the link between two nodes identified by id.
    pub fn remove_link(
        &mut self,
        source_id: u32,
        destination_id: u32,
    ) -> Result<(), TopologyError> {
        let source = self
            .nodes
            .get(&source_id)
            .ok_or(TopologyError::UnknownEndpoint { id: source_id })?
            .name
            .clone();
        let destination = self
            .nodes
            .get(&destination_id)
            .ok_or(TopologyError::UnknownEndpoint { id: destination_id })?
            .name
            .clone();

        let forward = self
            .adjacency
            .get_mut(&source)
            .and_then(|n| n.remove(&destination));
        if forward.is_none() {
            return Err(TopologyError::LinkNotFound {
                src: source_id,
                destination: destination_id,
            });
        }
        if let Some(back) = self.adjacency.get_mut(&destination) {
            back.remove(&source);
        }
        Ok(())
    }

    /// Whether a node with this name exists.
    pub fn contains_name(&self, name: &NodeName) -> bool {
        self.names.contains_key(name)
    }

    /// Whether a node with this id exists.
    pub fn contains_id(&self, id: u32) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The node record for a name, if present.
    pub fn node_by_name(&self, name: &NodeName) -> Option<&Node> {
        self.names.get(name).and_then(|id| self.nodes.get(id))
    }

    /// All node names, sorted for deterministic iteration.
    pub fn node_names(&self) -> Vec<NodeName> {
        let mut names: Vec<NodeName> = self.names.keys().cloned().collect();
        names.sort();
        names
    }

    /// The highest id currently in use, if any. Admission derives fresh ids
    /// above this.
    pub fn max_id(&self) -> Option<u32> {
        self.nodes.keys().copied().max()
    }

    /// Neighbors of a node with their edge weights.
    pub fn neighbors(&self, name: &NodeName) -> Option<&BTreeMap<NodeName, f64>> {
        self.adjacency.get(name)
    }

    /// Every undirected edge exactly once as `(smaller_name, larger_name, weight)`.
    pub fn edge_list(&self) -> Vec<(NodeName, NodeName, f64)> {
        let mut edges = Vec::new();
        for (source, neighbors) in &self.adjacency {
            for (destination, &weight) in neighbors {
                if source < destination {
                    edges.push((source.clone(), destination.clone(), weight));
                }
            }
        }
        edges.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        edges
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the topology has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
