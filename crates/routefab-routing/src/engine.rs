use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use routefab_core::NodeName;

use crate::error::RoutingError;
use crate::graph::TopologyGraph;
use crate::table::{PathEntry, RoutingTable, TableRow};

/// The shortest-path algorithm to run. A closed variant validated at
/// construction, not a string checked at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Priority-driven relaxation. Requires nonnegative weights, which
    /// bandwidth-derived topologies guarantee by construction.
    Dijkstra,
    /// Repeated full-edge relaxation with negative-cycle detection.
    BellmanFord,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dijkstra => write!(f, "dijkstra"),
            Self::BellmanFord => write!(f, "bellman_ford"),
        }
    }
}

/// Computes single-source or all-pairs shortest paths over a
/// [`TopologyGraph`] with the algorithm chosen at construction.
#[derive(Debug, Clone, Copy)]
pub struct ShortestPathEngine {
    algorithm: Algorithm,
}

/// Entry in the Dijkstra priority queue. Ordered so the `BinaryHeap`
/// max-heap pops the lowest cost first, breaking cost ties on the smaller
/// node name for deterministic exploration order.
#[derive(Debug, Clone)]
struct HeapEntry {
    cost: f64,
    name: NodeName,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost.to_bits() == other.cost.to_bits() && self.name == other.name
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.name.cmp(&self.name))
    }
}

impl ShortestPathEngine {
    /// Create an engine running the given algorithm.
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this engine runs.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Shortest paths from one source to every node in the graph.
    /// Unreachable destinations map to [`PathEntry::Unreachable`].
    pub fn single_source(
        &self,
        graph: &TopologyGraph,
        source: &NodeName,
    ) -> Result<TableRow, RoutingError> {
        if !graph.contains_name(source) {
            return Err(RoutingError::UnknownSource(source.clone()));
        }
        let (dist, pred) = match self.algorithm {
            Algorithm::Dijkstra => Self::dijkstra(graph, source),
            Algorithm::BellmanFord => Self::bellman_ford(graph, source)?,
        };

        let mut row = TableRow::new();
        for destination in graph.node_names() {
            let reachable = dist.get(&destination).is_some_and(|d| d.is_finite());
            let entry = if reachable {
                match Self::reconstruct(source, &destination, &pred) {
                    Some(path) => PathEntry::Path(path),
                    None => PathEntry::Unreachable,
                }
            } else {
                PathEntry::Unreachable
            };
            row.insert(destination, entry);
        }
        Ok(row)
    }

    /// All-pairs shortest paths: one single-source pass per node, assembled
    /// into a [`RoutingTable`]. A negative cycle fails the whole computation
    /// so the caller keeps its previous table.
    pub fn all_pairs(&self, graph: &TopologyGraph) -> Result<RoutingTable, RoutingError> {
        let mut table = RoutingTable::new();
        for source in graph.node_names() {
            let row = self.single_source(graph, &source)?;
            table.insert_row(source, row);
        }
        Ok(table)
    }

    /// Priority-driven relaxation from `source`. Ties on distance keep the
    /// lexicographically smallest predecessor so recomputation is
    /// deterministic across runs.
    fn dijkstra(
        graph: &TopologyGraph,
        source: &NodeName,
    ) -> (HashMap<NodeName, f64>, HashMap<NodeName, NodeName>) {
        let mut dist: HashMap<NodeName, f64> = HashMap::new();
        let mut pred: HashMap<NodeName, NodeName> = HashMap::new();
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();

        dist.insert(source.clone(), 0.0);
        heap.push(HeapEntry {
            cost: 0.0,
            name: source.clone(),
        });

        while let Some(HeapEntry { cost, name }) = heap.pop() {
            if cost > dist.get(&name).copied().unwrap_or(f64::INFINITY) {
                continue;
            }
            let Some(neighbors) = graph.neighbors(&name) else {
                continue;
            };
            for (next, &weight) in neighbors {
                let candidate = cost + weight;
                let best = dist.get(next).copied().unwrap_or(f64::INFINITY);
                if candidate < best {
                    dist.insert(next.clone(), candidate);
                    pred.insert(next.clone(), name.clone());
                    heap.push(HeapEntry {
                        cost: candidate,
                        name: next.clone(),
                    });
                } else if candidate == best && pred.get(next).is_some_and(|p| name < *p) {
                    pred.insert(next.clone(), name.clone());
                }
            }
        }
        (dist, pred)
    }

    /// Relax every edge (in both directions, links being undirected) up to
    /// |V|-1 times, then run one verification pass: any edge that still
    /// relaxes means a negative-weight cycle and the entire single-source
    /// computation fails with no partial result.
    fn bellman_ford(
        graph: &TopologyGraph,
        source: &NodeName,
    ) -> Result<(HashMap<NodeName, f64>, HashMap<NodeName, NodeName>), RoutingError> {
        let nodes = graph.node_names();
        let edges = graph.edge_list();

        let mut dist: HashMap<NodeName, f64> = nodes
            .iter()
            .map(|n| (n.clone(), f64::INFINITY))
            .collect();
        dist.insert(source.clone(), 0.0);
        let mut pred: HashMap<NodeName, NodeName> = HashMap::new();

        for _ in 1..nodes.len() {
            let mut changed = false;
            for (u, v, w) in &edges {
                changed |= Self::relax(&mut dist, &mut pred, u, v, *w);
                changed |= Self::relax(&mut dist, &mut pred, v, u, *w);
            }
            if !changed {
                break;
            }
        }

        for (u, v, w) in &edges {
            let du = dist.get(u).copied().unwrap_or(f64::INFINITY);
            let dv = dist.get(v).copied().unwrap_or(f64::INFINITY);
            if (du.is_finite() && du + w < dv) || (dv.is_finite() && dv + w < du) {
                return Err(RoutingError::NegativeCycle {
                    src: source.clone(),
                });
            }
        }
        Ok((dist, pred))
    }

    fn relax(
        dist: &mut HashMap<NodeName, f64>,
        pred: &mut HashMap<NodeName, NodeName>,
        u: &NodeName,
        v: &NodeName,
        weight: f64,
    ) -> bool {
        let du = dist.get(u).copied().unwrap_or(f64::INFINITY);
        if !du.is_finite() {
            return false;
        }
        let dv = dist.get(v).copied().unwrap_or(f64::INFINITY);
        if du + weight < dv {
            dist.insert(v.clone(), du + weight);
            pred.insert(v.clone(), u.clone());
            return true;
        }
        false
    }

    /// Walk the predecessor map back from `target` to `source`.
    fn reconstruct(
        source: &NodeName,
        target: &NodeName,
        pred: &HashMap<NodeName, NodeName>,
    ) -> Option<Vec<NodeName>> {
        if target == source {
            return Some(vec![source.clone()]);
        }
        let mut path = vec![target.clone()];
        let mut step = target;
        // The predecessor map is a tree; the bound guards against a
        // malformed map ever looping.
        while path.len() <= pred.len() + 1 {
            let prev = pred.get(step)?;
            path.push(prev.clone());
            if prev == source {
                path.reverse();
                return Some(path);
            }
            step = prev;
        }
        None
    }
}

/// Total weight of a path over the graph's current edge weights. Returns
/// `None` if any consecutive pair is not linked.
pub fn path_cost(graph: &TopologyGraph, path: &[NodeName]) -> Option<f64> {
    let mut total = 0.0;
    for hop in path.windows(2) {
        total += graph.neighbors(&hop[0])?.get(&hop[1])?;
    }
    Some(total)
}
