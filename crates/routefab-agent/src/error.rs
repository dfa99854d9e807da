use routefab_core::{CoreError, NodeName};
use routefab_crypto::CryptoError;
use routefab_net::NetError;
use routefab_routing::RoutingError;

/// Agent-side failures. Routing and connectivity failures are local to one
/// envelope: the caller logs and drops, nothing is reported upstream.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("invalid agent config: {0}")]
    InvalidConfig(String),

    #[error("no address book entry for node '{name}'")]
    UnknownPeer { name: NodeName },

    #[error("no sealing key on file for node '{name}'")]
    MissingSealingKey { name: NodeName },

    #[error("sealing key for '{name}' is not a 32-byte hex string")]
    InvalidSealingKey { name: NodeName },

    #[error("chunk from '{origin}' announces total {got}, transfer in flight has {expected}")]
    ChunkMismatch {
        origin: NodeName,
        expected: u32,
        got: u32,
    },

    #[error("local delivery channel closed")]
    DeliveryClosed,
}
