use routefab_core::NodeName;

/// Errors raised by topology mutations. The graph is left unchanged on every
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("link endpoint id {id} is not in the topology")]
    UnknownEndpoint { id: u32 },

    #[error("bandwidth must be positive and finite, got {bandwidth}")]
    InvalidBandwidth { bandwidth: f64 },

    #[error("edge weight must be finite, got {weight}")]
    InvalidWeight { weight: f64 },

    #[error("node name {name} is already registered under id {existing_id}")]
    DuplicateName { name: NodeName, existing_id: u32 },

    #[error("node {name} not found")]
    NodeNotFound { name: NodeName },

    #[error("no link between ids {src} and {destination}")]
    LinkNotFound { src: u32, destination: u32 },
}

/// Errors raised by shortest-path computation and table lookups.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("source node {0} is not in the topology")]
    UnknownSource(NodeName),

    #[error("negative-weight cycle detected while computing paths from {src}")]
    NegativeCycle { src: NodeName },

    #[error("no routing entry from {src} to {destination}")]
    NoEntry {
        src: NodeName,
        destination: NodeName,
    },
}
