/// Transport failures. Always local to one connection: the affected
/// operation is abandoned and the connection closed, other work unaffected.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
