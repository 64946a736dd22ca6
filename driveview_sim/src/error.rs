//! Error types for the simulation harness.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to start simulation runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write export to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
