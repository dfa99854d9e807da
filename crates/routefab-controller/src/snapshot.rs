use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use routefab_routing::{Algorithm, RoutingTable};

use crate::error::SnapshotError;

/// The persisted form of a published routing table, written after every
/// successful recomputation and read back on controller restart so nodes
/// never face an empty-table window. Best-effort: it may lag an in-flight
/// recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the table was computed.
    pub computed_at: DateTime<Utc>,
    /// Algorithm that produced it.
    pub algorithm: Algorithm,
    /// The full table, keyed by source node name.
    pub table: RoutingTable,
}

impl Snapshot {
    pub fn new(algorithm: Algorithm, table: RoutingTable) -> Self {
        Self {
            computed_at: Utc::now(),
            algorithm,
            table,
        }
    }
}

/// Write the snapshot atomically: serialize to a sibling temp file, then
/// rename over the target so a crash never leaves a torn file behind.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the snapshot if the file exists.
pub fn load(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use routefab_core::NodeName;
    use routefab_routing::{PathEntry, TableRow};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("routefab-snapshot-{}-{}.json", tag, nanos))
    }

    fn sample_table() -> RoutingTable {
        let mut table = RoutingTable::new();
        let mut row = TableRow::new();
        row.insert(
            NodeName::from("r2"),
            PathEntry::Path(vec![NodeName::from("r1"), NodeName::from("r2")]),
        );
        row.insert(NodeName::from("r9"), PathEntry::Unreachable);
        table.insert_row(NodeName::from("r1"), row);
        table
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("roundtrip");
        let snapshot = Snapshot::new(Algorithm::Dijkstra, sample_table());

        save(&path, &snapshot).unwrap();
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.table, snapshot.table);
        assert_eq!(loaded.algorithm, Algorithm::Dijkstra);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let path = temp_path("missing");
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let path = temp_path("overwrite");
        save(&path, &Snapshot::new(Algorithm::Dijkstra, sample_table())).unwrap();
        save(&path, &Snapshot::new(Algorithm::BellmanFord, RoutingTable::new())).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.algorithm, Algorithm::BellmanFord);
        assert!(loaded.table.is_empty());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let path = temp_path("corrupt");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(load(&path), Err(SnapshotError::Codec(_))));
        fs::remove_file(&path).ok();
    }
}
