//! Error types for cacher operations

use std::io;
use thiserror::Error;

/// Result type for cacher operations
pub type RedisResult<T> = Result<T, RedisError>;

/// Error type shared by the pool, codec, executor and subscription engine
#[derive(Error, Debug)]
pub enum RedisError {
    /// IO error during network operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Dial, authentication or database selection failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Network operation exceeded its deadline
    #[error("Operation timed out")]
    Timeout,

    /// Malformed frame or unexpected reply shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server answered with an error reply
    #[error("Server error: {0}")]
    Server(String),

    /// Reply could not be converted to the requested scalar type
    #[error("Type conversion error: {0}")]
    Type(String),

    /// Reply was nil (key or field not found)
    #[error("Nil reply")]
    Nil,

    /// A composite value could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored text is not a valid encoding of the requested shape
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The active-connection bound is reached and the pool does not wait
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The pool has been shut down
    #[error("Connection pool closed")]
    PoolClosed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RedisError {
    /// Whether the connection that produced this error must be discarded
    /// instead of going back to the pool.
    ///
    /// Server error replies and codec failures leave the session usable;
    /// transport and framing failures do not.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Connection(_) | Self::Timeout | Self::Protocol(_)
        )
    }

    /// Check if this error is a nil reply
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}
