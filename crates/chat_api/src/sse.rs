use crate::events::StreamFrame;

const FRAME_SEPARATOR: &str = "\n\n";
const EVENT_FIELD: &str = "event";
const DATA_FIELD: &str = "data";
const DONE_EVENT: &str = "done";

/// Incremental decoder for event-delimited text streams.
///
/// Bytes may arrive split at any position, including inside a multi-byte
/// character, a `\r\n` pair or a field name. Incomplete trailing input is held
/// until more bytes arrive. Once a `done` frame is decoded the decoder is
/// finished and ignores everything after it.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    pending_bytes: Vec<u8>,
    buffer: String,
    finished: bool,
}

impl SseFrameDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete frames.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamFrame> {
        if self.finished {
            return Vec::new();
        }

        self.decode_utf8(bytes);
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut frames = Vec::new();
        while let Some(split) = self.buffer.find(FRAME_SEPARATOR) {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(..split + FRAME_SEPARATOR.len());

            match parse_frame(&frame) {
                Some(StreamFrame::Done) => {
                    self.finish();
                    frames.push(StreamFrame::Done);
                    break;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
        }

        frames
    }

    /// Decode a complete payload in one shot.
    pub fn decode_all(input: &[u8]) -> Vec<StreamFrame> {
        let mut decoder = Self::default();
        decoder.feed(input)
    }

    /// True once a `done` frame has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.is_empty() && self.pending_bytes.is_empty()
    }

    fn finish(&mut self) {
        self.finished = true;
        self.buffer.clear();
        self.pending_bytes.clear();
    }

    fn decode_utf8(&mut self, bytes: &[u8]) {
        self.pending_bytes.extend_from_slice(bytes);

        let mut consumed = 0;
        while consumed < self.pending_bytes.len() {
            match std::str::from_utf8(&self.pending_bytes[consumed..]) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    consumed = self.pending_bytes.len();
                }
                Err(error) => {
                    let valid_end = consumed + error.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending_bytes[consumed..valid_end]));

                    match error.error_len() {
                        Some(invalid_len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + invalid_len;
                        }
                        // Truncated sequence at the tail: wait for the rest.
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending_bytes.drain(..consumed);
    }
}

fn parse_frame(frame: &str) -> Option<StreamFrame> {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut is_done = false;

    for line in frame.split('\n') {
        if let Some(value) = field_value(line, EVENT_FIELD) {
            // Servers sometimes pad the event name; `doneish` still is not `done`.
            if value.trim_end() == DONE_EVENT {
                is_done = true;
            }
        } else if let Some(value) = field_value(line, DATA_FIELD) {
            data_lines.push(value);
        }
    }

    if is_done {
        return Some(StreamFrame::Done);
    }

    let text = data_lines.join("\n");
    if text.is_empty() {
        None
    } else {
        Some(StreamFrame::Data { text })
    }
}

/// Returns the value of `field: value`, dropping exactly one leading space.
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let value = line.strip_prefix(field)?.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}

#[cfg(test)]
mod tests {
    use super::{field_value, parse_frame, SseFrameDecoder};
    use crate::events::StreamFrame;

    #[test]
    fn decode_frames_incrementally() {
        let mut decoder = SseFrameDecoder::default();
        let mut frames = Vec::new();

        frames.extend(decoder.feed(b"data: Hel\n\n"));
        assert_eq!(frames.len(), 1);

        frames.extend(decoder.feed(b"event: done\n\n"));
        assert_eq!(frames, vec![StreamFrame::data("Hel"), StreamFrame::Done]);
        assert!(decoder.is_finished());
        assert!(decoder.is_empty_buffer());
    }

    #[test]
    fn field_value_strips_exactly_one_space() {
        assert_eq!(field_value("data: x", "data"), Some("x"));
        assert_eq!(field_value("data:x", "data"), Some("x"));
        assert_eq!(field_value("data:   x", "data"), Some("  x"));
        assert_eq!(field_value("database: x", "data"), None);
        assert_eq!(field_value("id: 1", "data"), None);
    }

    #[test]
    fn done_frame_ignores_its_own_data_lines() {
        assert_eq!(
            parse_frame("event: done\ndata: trailing"),
            Some(StreamFrame::Done)
        );
    }

    #[test]
    fn other_event_names_do_not_terminate() {
        assert_eq!(
            parse_frame("event: message\ndata: body"),
            Some(StreamFrame::data("body"))
        );
        assert_eq!(parse_frame("event: doneish"), None);
    }

    #[test]
    fn padded_done_event_still_terminates() {
        assert_eq!(parse_frame("event: done "), Some(StreamFrame::Done));

        let frames = SseFrameDecoder::decode_all(b"data: a

event: done 	

data: b

");
        assert_eq!(frames, vec![StreamFrame::data("a"), StreamFrame::Done]);
    }

    #[test]
    fn invalid_utf8_becomes_replacement_character() {
        let frames = SseFrameDecoder::decode_all(b"data: a\xffb\n\n");
        assert_eq!(frames, vec![StreamFrame::data("a\u{fffd}b")]);
    }
}
