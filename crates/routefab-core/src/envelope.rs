use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::NodeName;

/// Serde helper to carry opaque payload bytes as base64 inside JSON frames.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// The kind of message an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// A single self-contained message.
    Text,
    /// One chunk of a larger payload. `seq` is the zero-based chunk index
    /// and `total` the number of chunks in the transfer; chunks may arrive
    /// in any order because each travels over its own connection.
    BulkChunk { seq: u32, total: u32 },
}

impl EnvelopeKind {
    pub fn is_bulk(&self) -> bool {
        matches!(self, Self::BulkChunk { .. })
    }
}

/// The hop-by-hop message exchanged between agents.
///
/// An envelope is ephemeral: it exists for the duration of one hop transfer.
/// Forwarders pass it on unchanged apart from the `hop_count` bookkeeping.
/// The payload is opaque to every hop except the destination, which holds
/// the key material to open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub kind: EnvelopeKind,
    /// Name of the node that originated the message.
    pub origin: NodeName,
    /// Name of the final destination node.
    pub destination: NodeName,
    /// Number of hops this envelope has already traversed.
    pub hop_count: u32,
    /// Opaque (sealed) payload bytes.
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create a text envelope at its origin.
    pub fn text(origin: NodeName, destination: NodeName, payload: Vec<u8>) -> Self {
        Self {
            kind: EnvelopeKind::Text,
            origin,
            destination,
            hop_count: 0,
            payload,
        }
    }

    /// Create one chunk of a bulk transfer at its origin.
    pub fn bulk_chunk(
        origin: NodeName,
        destination: NodeName,
        seq: u32,
        total: u32,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            kind: EnvelopeKind::BulkChunk { seq, total },
            origin,
            destination,
            hop_count: 0,
            payload,
        }
    }

    /// Copy of this envelope with the hop bookkeeping advanced by one.
    pub fn forwarded(&self) -> Self {
        let mut next = self.clone();
        next.hop_count += 1;
        next
    }

    /// Check structural invariants before the envelope goes on the wire.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.origin.as_str().is_empty() {
            return Err(CoreError::MissingField("origin".into()));
        }
        if self.destination.as_str().is_empty() {
            return Err(CoreError::MissingField("destination".into()));
        }
        if let EnvelopeKind::BulkChunk { seq, total } = self.kind {
            if total == 0 {
                return Err(CoreError::ValidationError("bulk transfer with total=0".into()));
            }
            if seq >= total {
                return Err(CoreError::ValidationError(format!(
                    "chunk seq {} out of range for total {}",
                    seq, total
                )));
            }
        }
        Ok(())
    }
}

/// Split a payload into fixed-size chunks for bulk transfer.
///
/// Every chunk except the last has exactly `chunk_size` bytes. An empty
/// payload yields a single empty chunk so the receiver still observes a
/// complete transfer.
pub fn split_chunks(payload: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    debug_assert!(chunk_size > 0, "chunk_size must be positive");
    if payload.is_empty() {
        return vec![Vec::new()];
    }
    payload.chunks(chunk_size).map(|c| c.to_vec()).collect()
}
