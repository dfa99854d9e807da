use std::collections::{BTreeMap, HashMap};

use routefab_core::NodeName;

use crate::error::AgentError;

/// Reassembles bulk transfers from independently routed chunks.
///
/// Chunks travel over separate connections and may arrive in any order; each
/// carries its zero-based `seq` and the transfer's `total`. A transfer is
/// complete when all `total` distinct sequence numbers have arrived, and the
/// payload is rebuilt in sequence order regardless of arrival order. One
/// transfer per origin may be in flight at a time.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    transfers: HashMap<NodeName, Transfer>,
}

#[derive(Debug)]
struct Transfer {
    total: u32,
    chunks: BTreeMap<u32, Vec<u8>>,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one decrypted chunk. Returns the full payload once the last
    /// missing chunk arrives, `None` while the transfer is incomplete. A
    /// duplicate sequence number overwrites the earlier copy. A chunk whose
    /// `total` disagrees with the transfer in flight aborts that transfer,
    /// and a fresh chunk 0 supersedes an unfinished transfer from the same
    /// origin, so a transfer that lost chunks in transit cannot bleed into
    /// the next one.
    pub fn accept(
        &mut self,
        origin: &NodeName,
        seq: u32,
        total: u32,
        chunk: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, AgentError> {
        if seq == 0 {
            if let Some(stale) = self.transfers.get(origin) {
                if stale.chunks.contains_key(&0) {
                    tracing::warn!(
                        %origin,
                        buffered = stale.chunks.len(),
                        "discarding unfinished bulk transfer"
                    );
                    self.transfers.remove(origin);
                }
            }
        }

        let transfer = self.transfers.entry(origin.clone()).or_insert_with(|| Transfer {
            total,
            chunks: BTreeMap::new(),
        });
        if transfer.total != total {
            let expected = transfer.total;
            self.transfers.remove(origin);
            return Err(AgentError::ChunkMismatch {
                origin: origin.clone(),
                expected,
                got: total,
            });
        }

        transfer.chunks.insert(seq, chunk);
        let received = transfer.chunks.len() as u32;
        if received == total {
            let transfer = self.transfers.remove(origin).unwrap();
            let payload: Vec<u8> = transfer.chunks.into_values().flatten().collect();
            return Ok(Some(payload));
        }
        tracing::debug!(%origin, seq, total, received, "bulk chunk buffered");
        Ok(None)
    }

    /// Number of transfers currently in flight.
    pub fn in_flight(&self) -> usize {
        self.transfers.len()
    }
}
