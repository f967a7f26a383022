/// One complete frame parsed from the event stream.
///
/// Frames without data lines never surface; only content and the
/// termination marker are meaningful to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Content frame; `text` is the newline-joined data payload.
    Data { text: String },
    /// `event: done` termination frame.
    Done,
}

impl StreamFrame {
    #[must_use]
    pub fn data(text: impl Into<String>) -> Self {
        Self::Data { text: text.into() }
    }
}

/// How a delta stream stopped producing deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTermination {
    /// The server sent the authoritative `done` frame.
    Done,
    /// The body ended without a `done` frame.
    TransportClosed,
}
