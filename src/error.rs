use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("missing or invalid input: {0}")]
    InvalidInput(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("recognizer request failed: {0}")]
    Upstream(String),

    #[error("QR encoding failed: {0}")]
    Qr(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Stable category string carried on every error response so clients can
    /// decide whether to retry, recapture, or restart the flow.
    pub fn category(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "input_error",
            RelayError::SessionNotFound => "not_found",
            RelayError::SessionExpired => "expired",
            RelayError::ExtractionFailed(_) => "extraction_failed",
            RelayError::Upstream(_) => "upstream_error",
            RelayError::Qr(_) | RelayError::Config(_) => "config_error",
            RelayError::Toml(_) | RelayError::Json(_) | RelayError::Io(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
