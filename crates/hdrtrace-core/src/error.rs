//! Error types for hdrtrace

use thiserror::Error;

/// hdrtrace error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A directive provider handed out a set that breaks its contract
    #[error("Malformed directive set for {header}: {detail}")]
    MalformedDirectives { header: String, detail: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for hdrtrace
pub type Result<T> = std::result::Result<T, Error>;
