use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid axis '{name}': {message}")]
    InvalidAxis { name: String, message: String },

    #[error("Shape mismatch: expected {expected} elements, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Degenerate distribution: {0}")]
    DegenerateDistribution(String),

    #[error("Missing resource {path:?}: {source}")]
    MissingResource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FusionResult<T> = Result<T, FusionError>;
