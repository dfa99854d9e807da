/// Core validation errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid node name: {0}")]
    InvalidNodeName(String),

    #[error("envelope validation failed: {0}")]
    ValidationError(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}
