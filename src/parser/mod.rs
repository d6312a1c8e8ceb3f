//! Incremental frame parser for the upstream text event stream.
//!
//! The transport delivers raw chunks with no line alignment; the parser
//! buffers the trailing incomplete fragment across pushes and only ever
//! interprets complete lines.

use tracing::debug;

use crate::core::event::Frame;


const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: String,
    current_event: Option<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw chunk and returns every frame completed by it. The last
    /// (possibly incomplete) line is held back until more data arrives or
    /// [`finish`](Self::finish) is called.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<Frame> {
        self.buffer.push_str(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(frame) = self.handle_line(line.trim_end_matches(['\n', '\r'])) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Consumes the held-back tail at end of stream.
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let tail = std::mem::take(&mut self.buffer);
        self.handle_line(tail.trim_end_matches('\r')).into_iter().collect()
    }

    fn handle_line(&mut self, line: &str) -> Option<Frame> {
        if line.trim().is_empty() {
            // Record boundary.
            self.current_event = None;
            return None;
        }

        if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
            self.current_event = Some(name.trim().to_string());
            return None;
        }

        let data = line.strip_prefix(DATA_PREFIX)?.trim();
        if data == DONE_SENTINEL {
            self.current_event = None;
            return None;
        }

        let event = self.current_event.clone()?;
        if data.is_empty() {
            self.current_event = None;
            return None;
        }

        match serde_json::from_str(data) {
            Ok(payload) => Some(Frame::new(event, payload)),
            Err(e) => {
                // Malformed payloads are dropped, never surfaced.
                debug!(event = %event, error = %e, "dropping malformed frame payload");
                self.current_event = None;
                None
            }
        }
    }
}
