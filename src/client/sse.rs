//! Event-stream line handling for chat completion streams.

use memchr::memchr;

/// Payload marking the end of a completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Reassembles complete lines from raw byte chunks.
///
/// Transports deliver arbitrary chunk boundaries: a single line may span
/// several chunks and one chunk may carry several lines. Blank lines and
/// lines that are not valid UTF-8 are dropped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Appends a chunk and returns every line it completed, trimmed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline) = memchr(b'\n', &self.buffer) {
            let mut end = newline;
            if end > 0 && self.buffer[end - 1] == b'\r' {
                end -= 1;
            }
            if let Ok(text) = std::str::from_utf8(&self.buffer[..end]) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            self.buffer.drain(..=newline);
        }
        lines
    }

    /// Flushes trailing bytes that never saw a newline.
    ///
    /// Returns `None` when the stream ended on a line boundary. Anything
    /// else is the partial tail of the final delivery unit.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let leftover = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        (!leftover.is_empty()).then_some(leftover)
    }
}

/// Extracts the payload of a `data:` line, if it is one.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// True for `text/event-stream` content types; parameters are ignored.
pub fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|value| value.eq_ignore_ascii_case("text/event-stream"))
}
