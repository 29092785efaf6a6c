//! One-way message relay over TCP.
//!
//! A sending process pushes a finite sequence of messages to a receiving
//! process, which hands each decoded message to a sink until the sender hangs
//! up or the receiver is interrupted. Either side may connect or listen, and
//! payloads travel as UTF-8 text, raw bytes, or GNU Radio PMT `u8vector`
//! envelopes.
//!
//! # Crate Structure
//!
//! - [`transport`]: active/passive TCP role resolution and cancellation
//! - [`frame`]: wire framing, payload modes and content transforms
//! - [`relay`]: the paced sender and cancellable receiver loops

/// Re-export transport types.
pub mod transport {
    pub use pushpull_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pushpull_frame::*;
}

/// Re-export relay loop types.
pub mod relay {
    pub use pushpull_relay::*;
}
