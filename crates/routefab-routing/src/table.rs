use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use routefab_core::NodeName;

/// One routing-table entry: the full precomputed path to a destination, or an
/// explicit unreachable marker. The marker is distinct from an empty path so
/// "no route" can never be confused with a malformed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathEntry {
    /// Ordered node names from source to destination (inclusive on both ends).
    Path(Vec<NodeName>),
    /// The destination cannot be reached from this source. Serializes as
    /// JSON `null`.
    Unreachable,
}

impl PathEntry {
    /// Whether this entry carries a usable path.
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Path(_))
    }

    /// The path, if reachable.
    pub fn path(&self) -> Option<&[NodeName]> {
        match self {
            Self::Path(p) => Some(p),
            Self::Unreachable => None,
        }
    }

    /// The next hop after the source, if the path has one. A length-1 path
    /// (source == destination) has no next hop: delivery is local.
    pub fn next_hop(&self) -> Option<&NodeName> {
        self.path().and_then(|p| p.get(1))
    }
}

/// A full destination-map row for one source node.
pub type TableRow = BTreeMap<NodeName, PathEntry>;

/// The per-source routing table: `source -> destination -> path`.
///
/// Recomputed wholesale by the shortest-path engine, never patched
/// incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingTable {
    rows: BTreeMap<NodeName, TableRow>,
}

impl RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the destination map for a source.
    pub fn insert_row(&mut self, source: NodeName, row: TableRow) {
        self.rows.insert(source, row);
    }

    /// The destination map for a source.
    pub fn row(&self, source: &NodeName) -> Option<&TableRow> {
        self.rows.get(source)
    }

    /// The entry for a (source, destination) pair.
    pub fn lookup(&self, source: &NodeName, destination: &NodeName) -> Option<&PathEntry> {
        self.rows.get(source).and_then(|row| row.get(destination))
    }

    /// All source names in the table.
    pub fn sources(&self) -> impl Iterator<Item = &NodeName> {
        self.rows.keys()
    }

    /// Number of source rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any reachable path in the table traverses the given node.
    /// Used to assert that eviction never leaves silently stale entries.
    pub fn traverses(&self, node: &NodeName) -> bool {
        self.rows.values().any(|row| {
            row.values()
                .any(|entry| entry.path().is_some_and(|p| p.contains(node)))
        })
    }

    /// Check the structural invariant on every reachable entry: the first
    /// element equals the source, the last equals the destination, and no
    /// path is empty.
    pub fn check_invariants(&self) -> bool {
        self.rows.iter().all(|(source, row)| {
            row.iter().all(|(destination, entry)| match entry {
                PathEntry::Unreachable => true,
                PathEntry::Path(p) => {
                    p.first() == Some(source) && p.last() == Some(destination)
                }
            })
        })
    }
}

/// Holder of the latest published routing table.
///
/// `replace` swaps the whole snapshot behind an `Arc`, so a reader holding or
/// taking a snapshot observes either wholly the old table or wholly the new
/// one, never a mix of rows from both.
#[derive(Debug)]
pub struct RoutingTableStore {
    current: RwLock<Arc<RoutingTable>>,
}

impl RoutingTableStore {
    /// Create a store publishing an empty table.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RoutingTable::new())),
        }
    }

    /// Create a store pre-seeded with a table (e.g. a persisted snapshot
    /// loaded at startup, avoiding an empty-table window).
    pub fn with_table(table: RoutingTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    /// Atomically publish a new table.
    pub fn replace(&self, table: RoutingTable) {
        let mut current = self.current.write().unwrap();
        *current = Arc::new(table);
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.current.read().unwrap().clone()
    }

    /// Clone out the entry for a (source, destination) pair.
    pub fn lookup(&self, source: &NodeName, destination: &NodeName) -> Option<PathEntry> {
        self.snapshot().lookup(source, destination).cloned()
    }

    /// Clone out the full destination map for a source.
    pub fn slice(&self, source: &NodeName) -> Option<TableRow> {
        self.snapshot().row(source).cloned()
    }
}

impl Default for RoutingTableStore {
    fn default() -> Self {
        Self::new()
    }
}
