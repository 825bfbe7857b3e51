//! Error types for fastpitch-loss-rs.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),

    /// An input tensor has the wrong rank or disagrees with another input.
    #[error("shape: {0}")]
    Shape(String),

    /// A named input tensor is absent from a batch file.
    #[error("missing tensor `{0}`")]
    MissingTensor(&'static str),

    /// A mask summed to zero, so its masked mean is undefined.
    #[error("empty mask: {0} has no valid positions")]
    EmptyMask(&'static str),

    /// Invalid configuration.
    #[error("config: {0}")]
    Config(String),

    /// I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
