use thiserror::Error;

/// Main error type for cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Control-flow signal: a tier refused admission. The coordinator
    /// handles this by evicting; it is never returned from a user-visible
    /// `set`.
    #[error("insufficient capacity")]
    InsufficientCapacity,

    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }

    pub fn is_insufficient_capacity(&self) -> bool {
        matches!(self, Self::InsufficientCapacity)
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<bincode::Error> for CacheError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::RemoteUnavailable(err.to_string())
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
