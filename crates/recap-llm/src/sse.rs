//! Incremental Server-Sent-Events decoding for provider responses.
//!
//! Bytes are buffered until a full line is available and only then decoded
//! as UTF-8, so multi-byte characters split across network chunks survive.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::LlmError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every message completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buf.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(msg) = self.process_line(&line) {
                messages.push(msg);
            }
        }
        messages
    }

    /// Flush whatever is left once the body ends. Servers are allowed to
    /// close without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseMessage> {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&rest);
            let line = line.trim_end_matches('\r');
            if let Some(msg) = self.process_line(line) {
                return Some(msg);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            // id / retry are meaningless for one-shot provider streams
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseMessage {
            event: self.event.take(),
            data,
        })
    }
}

/// Decode a byte stream (typically `reqwest::Response::bytes_stream`) into SSE messages.
pub fn decode_stream<S, E>(body: S) -> impl Stream<Item = Result<SseMessage, LlmError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for msg in decoder.push(&bytes) {
                        yield Ok(msg);
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        if let Some(msg) = decoder.finish() {
            yield Ok(msg);
        }
    }
}
