use crate::endpoint::Endpoint;

/// Errors that can occur while establishing or using a relay channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint text could not be parsed.
    #[error("invalid endpoint {input:?}: {reason}")]
    InvalidEndpoint { input: String, reason: String },

    /// The role text is not one of the accepted spellings.
    #[error("invalid role {0:?} (expected active/connect or passive/bind)")]
    InvalidRole(String),

    /// Failed to bind to the specified endpoint (address in use, unavailable).
    #[error("failed to bind to {endpoint}: {source}")]
    Bind {
        endpoint: Endpoint,
        source: std::io::Error,
    },

    /// Failed to connect to the specified endpoint (unreachable, refused).
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: Endpoint,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on an established channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cancellation was requested while waiting for a peer.
    #[error("cancelled while waiting for a peer")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, TransportError>;
