use serde::Deserialize;

/// Outcome of parsing one server-sent event from a completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// An incremental text fragment for the in-flight assistant message.
    Delta(String),
    /// The `[DONE]` sentinel: the stream finished normally.
    Done,
}

/// Incremental parser for the `text/event-stream` body of a streaming chat
/// completion. Feed it raw response bytes as they arrive; it buffers partial
/// events (and partial UTF-8 sequences) across chunk boundaries and only
/// decodes a block once its `\n\n` delimiter has been seen.
///
/// Malformed payloads are skipped, never fatal: a bad JSON fragment in one
/// event must not abort the stream or corrupt fragments already produced.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk of response bytes and returns the events completed
    /// by it, in arrival order. Events after a `Done` are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = find_event_delimiter(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if parse_event_block(&block[..pos], &mut events) {
                self.buffer.clear();
                return events;
            }
        }
        events
    }

    /// Flushes any trailing block left when the connection closes without a
    /// final delimiter.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let block = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        if !block.is_empty() {
            parse_event_block(&block, &mut events);
        }
        events
    }
}

fn find_event_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

/// Parses one delimited event block. Returns true when the block carried the
/// `[DONE]` sentinel.
fn parse_event_block(block: &[u8], events: &mut Vec<SseEvent>) -> bool {
    // The delimiter is ASCII, so a complete block is either valid UTF-8 or
    // garbage we can skip wholesale.
    let Ok(text) = std::str::from_utf8(block) else {
        return false;
    };
    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload == "[DONE]" {
            events.push(SseEvent::Done);
            return true;
        }
        if let Some(fragment) = parse_delta_fragment(payload) {
            events.push(SseEvent::Delta(fragment));
        }
    }
    false
}

fn parse_delta_fragment(payload: &str) -> Option<String> {
    let chunk: CompletionChunk = serde_json::from_str(payload).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    delta: CompletionDelta,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
#[path = "../tests/unit/sse_tests.rs"]
mod tests;
