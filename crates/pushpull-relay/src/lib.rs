//! Message loops for a one-way relay.
//!
//! The sending side walks a finite sequence of messages, encodes each with
//! the configured [`PayloadMode`], writes it as one frame and paces itself
//! with a cancellable delay. The receiving side pulls frames until the peer
//! hangs up or a [`CancelToken`] fires, handing every decoded message (or
//! decode failure) to a [`Sink`]. Either side may run a [`Pipeline`] of byte
//! transforms over message content.
//!
//! [`push`] and [`pull`] wrap the loops around an established
//! [`Channel`](pushpull_transport::Channel) and guarantee that the channel is
//! closed once, however the loop ends.

pub mod error;
pub mod receiver;
pub mod sender;
pub mod sink;

pub use error::{RelayError, Result};
pub use pushpull_frame::{Message, PayloadMode, Pipeline};
pub use pushpull_transport::CancelToken;
pub use receiver::{pull, DecodePolicy, ReceiveOptions, ReceiveReport, Receiver, StopReason};
pub use sender::{push, SendOptions, SendReport, Sender};
pub use sink::{CollectingSink, Sink, SinkEvent};
