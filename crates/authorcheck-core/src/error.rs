//! Error types for authorcheck

/// Result type alias using authorcheck's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for authorcheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors (missing source URL, missing dataset, bad settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// A required identifier could not be extracted from a source URL
    #[error("parse error: {0}")]
    Parse(String),

    /// Remote server answered with a non-success status
    #[error("http error: {url} returned status {status}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Network failure before a status was received
    #[error("transport error: {0}")]
    Transport(String),

    /// Dataset reading or validation errors
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Estimator fitting or prediction errors
    #[error("training error: {0}")]
    Training(String),

    /// Artifact encoding, decoding, or format errors
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Downloaded bytes did not match the configured digest
    #[error("integrity error: expected sha256 {expected}, got {actual}")]
    Integrity {
        /// Configured digest
        expected: String,
        /// Digest of the received bytes
        actual: String,
    },

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new HTTP status error
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Create a new training error
    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    /// Create a new artifact error
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
