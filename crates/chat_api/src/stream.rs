use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::ChatApiError;
use crate::events::{StreamFrame, StreamTermination};
use crate::sse::SseFrameDecoder;

/// Boxed response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatApiError>> + Send>>;

/// Lazy sequence of content deltas decoded from a response body.
///
/// A transport chunk is pulled only when no decoded delta is queued. The
/// sequence ends at the `done` frame or when the body closes, whichever comes
/// first, and never restarts.
pub struct DeltaStream {
    body: ByteStream,
    decoder: SseFrameDecoder,
    queued: VecDeque<String>,
    termination: Option<StreamTermination>,
    chunks_read: usize,
}

impl DeltaStream {
    pub fn new<S>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, ChatApiError>> + Send + 'static,
    {
        Self {
            body: Box::pin(body),
            decoder: SseFrameDecoder::default(),
            queued: VecDeque::new(),
            termination: None,
            chunks_read: 0,
        }
    }

    /// Builds a stream over already-received chunks.
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, ChatApiError>> =
            chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
        Self::new(futures_util::stream::iter(chunks))
    }

    /// Returns the next delta, `None` once the sequence has ended.
    pub async fn next_delta(&mut self) -> Result<Option<String>, ChatApiError> {
        loop {
            if let Some(delta) = self.queued.pop_front() {
                return Ok(Some(delta));
            }

            if self.termination.is_some() {
                return Ok(None);
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    self.chunks_read += 1;
                    self.enqueue_frames(&chunk);
                }
                Some(Err(error)) => return Err(error),
                None => {
                    self.termination = Some(StreamTermination::TransportClosed);
                }
            }
        }
    }

    /// Drains the remaining deltas into a vector.
    pub async fn collect_deltas(&mut self) -> Result<Vec<String>, ChatApiError> {
        let mut deltas = Vec::new();
        while let Some(delta) = self.next_delta().await? {
            deltas.push(delta);
        }
        Ok(deltas)
    }

    /// How the sequence ended; `None` while deltas may still arrive.
    pub fn termination(&self) -> Option<StreamTermination> {
        if self.queued.is_empty() {
            self.termination
        } else {
            None
        }
    }

    pub fn chunks_read(&self) -> usize {
        self.chunks_read
    }

    fn enqueue_frames(&mut self, chunk: &[u8]) {
        for frame in self.decoder.feed(chunk) {
            match frame {
                StreamFrame::Data { text } => self.queued.push_back(text),
                StreamFrame::Done => {
                    self.termination = Some(StreamTermination::Done);
                }
            }
        }
    }
}

impl fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaStream")
            .field("queued", &self.queued.len())
            .field("termination", &self.termination)
            .field("chunks_read", &self.chunks_read)
            .finish_non_exhaustive()
    }
}
