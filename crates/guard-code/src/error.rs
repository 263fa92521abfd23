//! Error types for guard code generation

/// Errors from decoding a configured shared secret.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shared secret is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("shared secret decodes to zero bytes")]
    Empty,
}

/// Result alias for guard code operations.
pub type Result<T> = std::result::Result<T, Error>;
