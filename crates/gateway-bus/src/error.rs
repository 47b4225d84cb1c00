//! Errors raised by bus transports.

/// Result type for gateway-bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors raised publishing to or subscribing from the invalidation bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The transport (Redis connection, broadcast channel) is unavailable.
    #[error("bus unavailable: {0}")]
    Unavailable(String),

    /// An event could not be encoded or decoded.
    #[error("bus codec error: {0}")]
    Codec(String),
}
