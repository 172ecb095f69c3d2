//! Incremental parser for the `text/event-stream` body of a streamed chat
//! completion. Transport chunks arrive at arbitrary byte boundaries, so the
//! parser buffers undecoded bytes, reassembles `data:` frames line by line and
//! yields the text deltas found at `choices[0].delta.content`.

use serde_json::Value;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseParser {
    /// Bytes received but not yet decodable (a multi-byte character split
    /// across chunk boundaries waits here for its remaining bytes).
    bytes: Vec<u8>,
    /// Decoded text not yet split into complete lines.
    text_buffer: String,
    done: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been observed. Later chunks are
    /// ignored entirely.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds one transport chunk and returns the text deltas it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.decode(chunk);
        self.drain_lines(false)
    }

    /// Final flush at end-of-stream. Remaining lines are processed one last
    /// time; a frame that still fails to parse is truncated and dropped since
    /// no further chunks can complete it.
    pub fn finish(&mut self) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        if !self.bytes.is_empty() {
            let tail = std::mem::take(&mut self.bytes);
            self.text_buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        if !self.text_buffer.is_empty() && !self.text_buffer.ends_with('\n') {
            self.text_buffer.push('\n');
        }
        self.drain_lines(true)
    }

    /// Appends `chunk` to the byte tail and moves every complete UTF-8
    /// sequence into `text_buffer`. An incomplete trailing sequence stays
    /// buffered; an invalid sequence becomes a replacement character.
    fn decode(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(text) => {
                    self.text_buffer.push_str(text);
                    self.bytes.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.bytes[..valid]) {
                        self.text_buffer.push_str(text);
                    }
                    match err.error_len() {
                        // More data may follow: keep the partial sequence.
                        None => {
                            self.bytes.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            self.text_buffer.push(char::REPLACEMENT_CHARACTER);
                            self.bytes.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self, eof: bool) -> Vec<String> {
        let mut deltas = Vec::new();

        while let Some(newline) = self.text_buffer.find('\n') {
            let mut line = self.text_buffer[..newline].to_string();
            self.text_buffer.drain(..=newline);

            if line.ends_with('\r') {
                line.pop();
            }
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let payload = match line.strip_prefix(DATA_PREFIX) {
                Some(rest) => rest.trim(),
                None => continue,
            };
            if payload == DONE_SENTINEL {
                self.done = true;
                return deltas;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(event) => {
                    if let Some(delta) = event["choices"][0]["delta"]["content"].as_str() {
                        if !delta.is_empty() {
                            deltas.push(delta.to_string());
                        }
                    }
                }
                Err(_) if !eof => {
                    // The frame straddles a chunk boundary. Not an error: put
                    // the line back and wait for the rest of it.
                    self.text_buffer.insert(0, '\n');
                    self.text_buffer.insert_str(0, &line);
                    return deltas;
                }
                // Closing flush: the frame can never complete, drop it.
                Err(_) => {}
            }
        }

        deltas
    }
}
