//! Push the demo sequence to a receiver in the same process.
//!
//! Run with:
//!   cargo run --example loopback
//!
//! The receiver binds an ephemeral loopback port; the sender connects to it,
//! sends three GNU Radio PMT u8vector frames half a second apart, then hangs
//! up.

use std::thread;
use std::time::Duration;

use pushpull::frame::{FrameConfig, Message, PayloadMode};
use pushpull::relay::{pull, push, CancelToken, ReceiveOptions, SendOptions, SinkEvent};
use pushpull::transport::{Endpoint, TransportContext};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = TransportContext::new();
    let listener = ctx.listen(&Endpoint::localhost(0))?;
    let endpoint = Endpoint::from(listener.local_addr());
    eprintln!("Listening on {endpoint}");

    let receiver = thread::spawn(move || {
        let cancel = CancelToken::new();
        let channel = listener.accept_one(&cancel)?;
        let mut sink = |event: SinkEvent| match event {
            SinkEvent::Message { index, message } => {
                eprintln!(
                    "#{index}: {}",
                    String::from_utf8_lossy(message.as_bytes())
                );
            }
            SinkEvent::DecodeError { index, error } => eprintln!("#{index}: {error}"),
        };
        let report = pull(
            channel,
            PayloadMode::TypedEnvelope,
            FrameConfig::default(),
            ReceiveOptions::default(),
            &mut sink,
            &cancel,
        )?;
        Ok::<_, pushpull::relay::RelayError>(report)
    });

    let channel = ctx.connect(&endpoint)?;
    let messages = ["Hello, world!", "This is a PUSH/PULL demo.", "Goodbye!"].map(Message::from);
    let sent = push(
        channel,
        PayloadMode::TypedEnvelope,
        FrameConfig::default(),
        messages,
        SendOptions::paced(Duration::from_millis(500)),
        &CancelToken::new(),
    )?;
    eprintln!("Sent {} message(s)", sent.sent);

    let report = receiver
        .join()
        .map_err(|_| "receiver thread panicked")??;
    eprintln!("Receiver stopped: {} after {} message(s)", report.stop, report.received);

    ctx.shutdown();
    Ok(())
}
