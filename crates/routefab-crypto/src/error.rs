/// Errors from key handling and payload sealing.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid key material: {0}")]
    InvalidInput(String),

    #[error("sealing failed: {0}")]
    SealError(String),

    #[error("unsealing failed: {0}")]
    OpenError(String),
}
