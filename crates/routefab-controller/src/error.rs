use routefab_crypto::CryptoError;
use routefab_net::NetError;
use routefab_routing::{RoutingError, TopologyError};

/// Controller-side failures. Connection-scoped variants never touch shared
/// state; recomputation failures leave the previous snapshot authoritative.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("presented identity is invalid: {0}")]
    InvalidIdentity(String),
}

/// Failures persisting or loading the routing-table snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Codec(#[from] serde_json::Error),
}
