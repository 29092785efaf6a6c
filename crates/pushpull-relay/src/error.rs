use pushpull_frame::PayloadError;

/// Errors that end a relay loop.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] pushpull_transport::TransportError),

    /// Frame-level error (I/O failure, malformed stream, truncated frame).
    #[error("frame error: {0}")]
    Frame(#[from] pushpull_frame::FrameError),

    /// A message could not be encoded; the rest of the sequence is abandoned.
    #[error("cannot encode message #{index}: {source}")]
    Encode { index: usize, source: PayloadError },

    /// A frame could not be decoded under the fail-fast policy.
    #[error("cannot decode frame #{index}: {source}")]
    Decode { index: usize, source: PayloadError },
}

pub type Result<T> = std::result::Result<T, RelayError>;
