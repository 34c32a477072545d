use tracing::warn;

use super::StreamChunk;

/// Splits streamed model text into newline-delimited JSON chunks.
/// Text can arrive cut at any byte, so partial lines stay buffered until their newline shows up.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: String,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) -> Vec<StreamChunk> {
        self.buffer.push_str(text);
        let mut out = Vec::new();
        while let Some(eol) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=eol).collect();
            if let Some(chunk) = parse_line(line.trim()) {
                out.push(chunk);
            }
        }
        out
    }

    /// Flush whatever is left once the upstream is exhausted.
    pub fn finish(&mut self) -> Option<StreamChunk> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(rest.trim())
    }
}

fn parse_line(line: &str) -> Option<StreamChunk> {
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<StreamChunk>(line) {
        Ok(chunk) => Some(chunk),
        Err(_) => {
            warn!("Could not parse stream line as JSON, skipping: {}", line);
            None
        }
    }
}

/// Minimal Server-Sent Events reader: yields the `data:` payload of each event.
#[derive(Debug, Default)]
pub struct SseFrameBuffer {
    pending: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(eol) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=eol).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.trim_start().to_string());
            }
            // comments, `event:`, `id:` and `retry:` lines carry nothing we need
        }
        events
    }

    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw).trim_end().to_string();
            if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.trim_start().to_string());
            }
        }
        self.take_event()
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data_lines).join("\n"))
    }
}
