//! Error types for the heimdall sync service

/// Errors that can occur in the heimdall sync service
#[derive(Debug, thiserror::Error)]
pub enum HeimdallError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Push channel error: {0}")]
    Channel(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for heimdall operations
pub type Result<T> = std::result::Result<T, HeimdallError>;
