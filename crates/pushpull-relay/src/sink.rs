use pushpull_frame::{Message, PayloadError};

/// What the receiver hands to its sink for each frame.
///
/// `index` counts frames in arrival order, starting at 0, whether or not they
/// decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Message { index: usize, message: Message },
    DecodeError { index: usize, error: PayloadError },
}

/// Consumer of received messages.
///
/// Implemented for any `FnMut(SinkEvent)`, so a closure is usually enough.
pub trait Sink {
    fn on_event(&mut self, event: SinkEvent);
}

impl<F> Sink for F
where
    F: FnMut(SinkEvent),
{
    fn on_event(&mut self, event: SinkEvent) {
        self(event)
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<SinkEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successfully decoded messages, in arrival order.
    pub fn messages(&self) -> Vec<&Message> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Message { message, .. } => Some(message),
                SinkEvent::DecodeError { .. } => None,
            })
            .collect()
    }

    /// Number of frames that failed to decode.
    pub fn decode_errors(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, SinkEvent::DecodeError { .. }))
            .count()
    }
}

impl Sink for CollectingSink {
    fn on_event(&mut self, event: SinkEvent) {
        self.events.push(event);
    }
}
