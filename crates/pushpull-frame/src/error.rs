use crate::payload::PayloadMode;

/// Errors that can occur while moving frames over a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x5050 \"PP\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer closed the stream in the middle of a frame.
    #[error("connection closed mid-frame ({buffered} bytes of an incomplete frame)")]
    Truncated { buffered: usize },
}

impl FrameError {
    /// True when a read gave up because the stream's read timeout elapsed.
    ///
    /// Nothing is lost: buffered bytes stay in the reader and the next
    /// `read_frame` continues where this one stopped.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// A message does not fit the configured payload mode.
///
/// Returned by [`PayloadMode::encode`] and [`PayloadMode::decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// A text frame is not valid UTF-8.
    #[error("text frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The message variant cannot be carried by this mode.
    #[error("{mode} mode cannot carry a {kind} message")]
    ModeMismatch {
        mode: PayloadMode,
        kind: &'static str,
    },

    /// The envelope does not start with the uniform-vector tag.
    #[error("unexpected envelope tag 0x{found:02x} (expected 0x{expected:02x})")]
    UnexpectedTag { expected: u8, found: u8 },

    /// The uniform vector holds something other than `u8` elements.
    #[error("unexpected uniform vector type 0x{found:02x} (expected u8 0x{expected:02x})")]
    UnexpectedVectorType { expected: u8, found: u8 },

    /// The envelope ends before its header or declared element count.
    #[error("truncated envelope (needs {needed} bytes, frame has {available})")]
    Truncated { needed: usize, available: usize },

    /// Bytes follow the declared payload.
    #[error("{0} trailing bytes after envelope payload")]
    TrailingBytes(usize),

    /// The payload is longer than a 32-bit element count can describe.
    #[error("payload of {0} bytes exceeds the envelope element count limit")]
    TooLarge(usize),

    /// A transform stage failed on the message content.
    #[error("transform failed: {0}")]
    Transform(#[from] crate::transform::TransformError),

    /// Unrecognized payload mode name.
    #[error("unknown payload mode {0:?} (expected text, raw-binary or typed-envelope)")]
    UnknownMode(String),
}
