//! Error types for the library layer.
//!
//! Binaries and host glue wrap these in `anyhow`; nothing in the scene pipeline
//! itself is fatal, so most of these end up logged rather than propagated.

use thiserror::Error;

/// Failure to read a track catalog payload.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a genre enrichment lookup.
///
/// Any of these abandons the batch it happened in.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("no preview URLs to classify")]
    EmptyBatch,

    #[error("invalid enrichment endpoint `{0}`")]
    InvalidEndpoint(String),

    #[error("enrichment request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("enrichment endpoint answered HTTP {0}")]
    Status(u16),

    #[error("enrichment response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("single-record response for a batch of {0} URLs")]
    AmbiguousRecord(usize),
}

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
