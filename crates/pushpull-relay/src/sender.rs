use std::io::Write;
use std::time::Duration;

use pushpull_frame::{FrameConfig, FrameWriter, Message, PayloadError, PayloadMode, Pipeline};
use pushpull_transport::{CancelToken, Channel};
use tracing::{debug, info};

use crate::error::{RelayError, Result};

/// Outcome of [`Sender::send_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Messages written to the stream.
    pub sent: usize,
    /// True if cancellation stopped the sequence early.
    pub cancelled: bool,
}

/// Pacing and content transforms for [`push`].
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Wait between consecutive messages.
    pub delay: Duration,
    /// Applied to each message before it is encoded.
    pub transform: Pipeline,
}

impl SendOptions {
    pub fn paced(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: Pipeline) -> Self {
        self.transform = transform;
        self
    }
}

/// Sending half of a relay.
pub struct Sender<W> {
    writer: FrameWriter<W>,
    mode: PayloadMode,
    transform: Pipeline,
}

impl<W: Write> Sender<W> {
    pub fn new(writer: FrameWriter<W>, mode: PayloadMode) -> Self {
        Self {
            writer,
            mode,
            transform: Pipeline::new(),
        }
    }

    /// Run `transform` over every message before encoding it.
    pub fn with_transform(mut self, transform: Pipeline) -> Self {
        self.transform = transform;
        self
    }

    pub fn mode(&self) -> PayloadMode {
        self.mode
    }

    /// Transform and encode one message, then write it as a single frame.
    ///
    /// `index` only labels errors and log lines.
    pub fn send(&mut self, index: usize, message: &Message) -> Result<()> {
        let payload = self
            .transform
            .apply(message)
            .map_err(PayloadError::from)
            .and_then(|message| self.mode.encode(&message))
            .map_err(|source| RelayError::Encode { index, source })?;
        self.writer.send(&payload)?;
        debug!(index, size = payload.len(), mode = %self.mode, "frame sent");
        Ok(())
    }

    /// Send every message in order, waiting `delay` between consecutive
    /// messages.
    ///
    /// The first encode or write failure ends the sequence with an error.
    /// Cancellation is checked before each message and interrupts the wait.
    pub fn send_all<I>(
        &mut self,
        messages: I,
        delay: Duration,
        cancel: &CancelToken,
    ) -> Result<SendReport>
    where
        I: IntoIterator<Item = Message>,
    {
        let mut messages = messages.into_iter().peekable();
        let mut sent = 0usize;

        while let Some(message) = messages.next() {
            if cancel.is_cancelled() {
                info!(sent, "send cancelled");
                return Ok(SendReport {
                    sent,
                    cancelled: true,
                });
            }

            self.send(sent, &message)?;
            sent += 1;

            if messages.peek().is_some() && !delay.is_zero() && cancel.wait_timeout(delay) {
                info!(sent, "send cancelled");
                return Ok(SendReport {
                    sent,
                    cancelled: true,
                });
            }
        }

        Ok(SendReport {
            sent,
            cancelled: false,
        })
    }

    pub fn get_ref(&self) -> &FrameWriter<W> {
        &self.writer
    }

    pub fn into_inner(self) -> FrameWriter<W> {
        self.writer
    }
}

impl Sender<Channel> {
    /// Close the channel, telling the receiver the sequence is over.
    pub fn finish(self) -> Result<()> {
        let mut channel = self.writer.into_inner();
        channel.close()?;
        Ok(())
    }
}

/// Run the sending side over an established channel.
///
/// The channel is closed on every path; a send error takes precedence over a
/// close error.
pub fn push<I>(
    channel: Channel,
    mode: PayloadMode,
    config: FrameConfig,
    messages: I,
    options: SendOptions,
    cancel: &CancelToken,
) -> Result<SendReport>
where
    I: IntoIterator<Item = Message>,
{
    let writer = FrameWriter::with_config_channel(channel, config)?;
    let mut sender = Sender::new(writer, mode).with_transform(options.transform);

    let result = sender.send_all(messages, options.delay, cancel);
    let closed = sender.finish();

    let report = result?;
    closed?;
    info!(sent = report.sent, cancelled = report.cancelled, "send sequence finished");
    Ok(report)
}
