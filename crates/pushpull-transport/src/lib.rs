//! Active/passive TCP role resolution.
//!
//! A relay process either initiates the connection to its peer
//! ([`Role::Active`]) or binds an endpoint and accepts exactly one peer
//! ([`Role::Passive`]). Both paths end in the same [`Channel`] type, which
//! the framing layer reads from or writes to.
//!
//! Channels are produced by a [`TransportContext`], a scoped handle created
//! once at startup and shut down once at exit.

pub mod cancel;
pub mod channel;
pub mod context;
pub mod endpoint;
pub mod error;

pub use cancel::CancelToken;
pub use channel::Channel;
pub use context::{establish, PassiveListener, TransportConfig, TransportContext};
pub use endpoint::{Endpoint, Role, DEFAULT_ADDRESS, DEFAULT_PORT};
pub use error::{Result, TransportError};
