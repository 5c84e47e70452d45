use etopo::EtopoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransectError {
    #[error("invalid path: {0}")]
    InvalidPath(&'static str),

    #[error("no variable '{0}' in dataset")]
    InvalidVariable(String),

    #[error("no depth-bearing substitute for '{0}'")]
    DepthUnavailable(String),

    #[error("dataset '{0}' unavailable: {1}")]
    DataUnavailable(String, String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Raster(#[from] EtopoError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("cache artifact: {0}")]
    Cache(#[from] bincode::Error),

    #[error("config: {0}")]
    Config(#[from] serde_json::Error),
}
