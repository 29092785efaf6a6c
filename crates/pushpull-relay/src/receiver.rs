use std::io::Read;

use pushpull_frame::{FrameConfig, FrameError, FrameReader, PayloadError, PayloadMode, Pipeline};
use pushpull_transport::{CancelToken, Channel};
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::sink::{Sink, SinkEvent};

/// What to do with a frame whose payload does not decode under the
/// configured mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Report the failure to the sink and keep receiving.
    #[default]
    Skip,
    /// Report the failure to the sink, then stop with [`RelayError::Decode`].
    FailFast,
}

/// Why a receive loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancel token fired.
    Interrupted,
    /// The peer closed the stream between frames.
    EndOfStream,
    /// The configured message limit was reached.
    Limit,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Interrupted => "interrupted",
            StopReason::EndOfStream => "end-of-stream",
            StopReason::Limit => "limit",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Receiver::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Frames decoded and handed to the sink as messages.
    pub received: usize,
    /// Frames that failed to decode.
    pub rejected: usize,
    pub stop: StopReason,
}

/// Decode policy, message limit and content transforms for [`pull`].
#[derive(Debug, Clone, Default)]
pub struct ReceiveOptions {
    pub policy: DecodePolicy,
    /// Stop after this many decoded messages.
    pub limit: Option<usize>,
    /// Applied to each decoded message before it reaches the sink.
    pub transform: Pipeline,
}

impl ReceiveOptions {
    pub fn with_policy(policy: DecodePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_transform(mut self, transform: Pipeline) -> Self {
        self.transform = transform;
        self
    }
}

/// Receiving half of a relay.
pub struct Receiver<R> {
    reader: FrameReader<R>,
    mode: PayloadMode,
    policy: DecodePolicy,
    transform: Pipeline,
    limit: Option<usize>,
    frames: usize,
    received: usize,
    rejected: usize,
}

impl<R: Read> Receiver<R> {
    pub fn new(reader: FrameReader<R>, mode: PayloadMode, policy: DecodePolicy) -> Self {
        Self {
            reader,
            mode,
            policy,
            transform: Pipeline::new(),
            limit: None,
            frames: 0,
            received: 0,
            rejected: 0,
        }
    }

    /// Stop after `limit` successfully decoded messages.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Run `transform` over every decoded message. A transform failure is
    /// handled like a decode failure.
    pub fn with_transform(mut self, transform: Pipeline) -> Self {
        self.transform = transform;
        self
    }

    pub fn mode(&self) -> PayloadMode {
        self.mode
    }

    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// Receive frames until the peer hangs up, `cancel` fires or the limit is
    /// reached, handing each one to `sink`.
    ///
    /// Cancellation is checked before every read and again each time a
    /// blocked read times out, so a stream with a read timeout notices it
    /// within one timeout period. Malformed streams and I/O failures end the
    /// loop with [`RelayError::Frame`].
    pub fn run<S>(&mut self, sink: &mut S, cancel: &CancelToken) -> Result<ReceiveReport>
    where
        S: Sink + ?Sized,
    {
        loop {
            if cancel.is_cancelled() {
                info!(received = self.received, "receive interrupted");
                return Ok(self.report(StopReason::Interrupted));
            }
            if self.limit.is_some_and(|limit| self.received >= limit) {
                debug!(received = self.received, "receive limit reached");
                return Ok(self.report(StopReason::Limit));
            }

            let payload = match self.reader.read_frame() {
                Ok(payload) => payload,
                Err(err) if err.is_timeout() => continue,
                Err(FrameError::ConnectionClosed) => {
                    info!(received = self.received, "peer closed the stream");
                    return Ok(self.report(StopReason::EndOfStream));
                }
                Err(err) => return Err(err.into()),
            };

            let index = self.frames;
            self.frames += 1;
            debug!(index, size = payload.len(), mode = %self.mode, "frame received");

            let decoded = self.mode.decode(payload).and_then(|message| {
                self.transform
                    .apply(&message)
                    .map_err(PayloadError::from)
            });
            match decoded {
                Ok(message) => {
                    self.received += 1;
                    sink.on_event(SinkEvent::Message { index, message });
                }
                Err(error) => {
                    self.rejected += 1;
                    warn!(index, %error, mode = %self.mode, "frame does not decode");
                    sink.on_event(SinkEvent::DecodeError {
                        index,
                        error: error.clone(),
                    });
                    if self.policy == DecodePolicy::FailFast {
                        return Err(RelayError::Decode {
                            index,
                            source: error,
                        });
                    }
                }
            }
        }
    }

    fn report(&self, stop: StopReason) -> ReceiveReport {
        ReceiveReport {
            received: self.received,
            rejected: self.rejected,
            stop,
        }
    }

    pub fn get_ref(&self) -> &FrameReader<R> {
        &self.reader
    }

    pub fn into_inner(self) -> FrameReader<R> {
        self.reader
    }
}

impl Receiver<Channel> {
    /// Close the underlying channel.
    pub fn close(self) -> Result<()> {
        let mut channel = self.reader.into_inner();
        channel.close()?;
        Ok(())
    }
}

/// Run the receiving side over an established channel.
///
/// The channel is closed on every path; a receive error takes precedence over
/// a close error.
pub fn pull<S>(
    channel: Channel,
    mode: PayloadMode,
    config: FrameConfig,
    options: ReceiveOptions,
    sink: &mut S,
    cancel: &CancelToken,
) -> Result<ReceiveReport>
where
    S: Sink + ?Sized,
{
    let reader = FrameReader::with_config_channel(channel, config)?;
    let mut receiver = Receiver::new(reader, mode, options.policy)
        .with_limit(options.limit)
        .with_transform(options.transform);

    let result = receiver.run(sink, cancel);
    let closed = receiver.close();

    let report = result?;
    closed?;
    info!(
        received = report.received,
        rejected = report.rejected,
        stop = %report.stop,
        "receive loop finished"
    );
    Ok(report)
}
