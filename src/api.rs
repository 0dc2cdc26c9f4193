use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::app::{OutboundMessage, StreamTarget};
use crate::config::ApiConfig;
use crate::sse::{SseEvent, SseParser};

/// Events a streaming request worker reports back to the UI loop. Every
/// event carries the target it was started for, so the reducer can drop
/// anything that is no longer current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta {
        target: StreamTarget,
        text: String,
    },
    Completed {
        target: StreamTarget,
    },
    Interrupted {
        target: StreamTarget,
    },
    Failed {
        target: StreamTarget,
        message: String,
    },
}

#[derive(Debug)]
pub struct ChatRequest {
    pub target: StreamTarget,
    pub system_prompt: String,
    pub messages: Vec<OutboundMessage>,
}

/// Runs one cancellable streaming completion request at a time on a worker
/// thread, reporting progress over an mpsc channel the UI loop drains.
pub struct CompletionAdapter {
    config: ApiConfig,
    event_tx: Sender<StreamEvent>,
    event_rx: Receiver<StreamEvent>,
    active_cancel: Option<Arc<AtomicBool>>,
}

impl CompletionAdapter {
    pub fn new(config: ApiConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            config,
            event_tx,
            event_rx,
            active_cancel: None,
        }
    }

    /// Starts a streaming request, cancelling any request still in flight
    /// first. The prior worker winds down on its own; its remaining events
    /// carry a stale target and get dropped by the reducer.
    pub fn send_chat(&mut self, request: ChatRequest) {
        self.cancel_active();
        let cancel = Arc::new(AtomicBool::new(false));
        self.active_cancel = Some(cancel.clone());
        let config = self.config.clone();
        let tx = self.event_tx.clone();
        thread::spawn(move || run_request(&config, request, &cancel, &tx));
    }

    pub fn cancel_active(&mut self) {
        if let Some(flag) = self.active_cancel.take() {
            flag.store(true, Ordering::Relaxed);
        }
    }

    pub fn drain_events_limited(&self, max_events: usize) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if max_events == 0 {
            return events;
        }
        while events.len() < max_events {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            events.push(event);
        }
        events
    }

    #[cfg(test)]
    fn test_sender(&self) -> Sender<StreamEvent> {
        self.event_tx.clone()
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn build_request_body(model: &str, request: &ChatRequest) -> serde_json::Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(WireMessage {
        role: "system",
        content: &request.system_prompt,
    });
    for message in &request.messages {
        messages.push(WireMessage {
            role: message.role,
            content: &message.content,
        });
    }
    serde_json::json!({
        "model": model,
        "stream": true,
        "messages": messages,
    })
}

fn run_request(
    config: &ApiConfig,
    request: ChatRequest,
    cancel: &AtomicBool,
    tx: &Sender<StreamEvent>,
) {
    let target = request.target;

    let api_key = match std::env::var(&config.key_env) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            fail(tx, target, format!("environment variable {} is not set", config.key_env));
            return;
        }
    };

    let client = match reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(None)
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            fail(tx, target, format!("could not build HTTP client: {err}"));
            return;
        }
    };

    let url = format!(
        "{}/chat/completions",
        config.base_url.trim_end_matches('/')
    );
    let body = build_request_body(&config.model, &request);
    let response = client.post(url).bearer_auth(api_key).json(&body).send();

    let mut response = match response {
        Ok(response) => response,
        Err(err) => {
            if cancel.load(Ordering::Relaxed) {
                let _ = tx.send(StreamEvent::Interrupted { target });
            } else {
                fail(tx, target, format!("request failed: {err}"));
            }
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().unwrap_or_default();
        let detail = detail.trim();
        let message = if detail.is_empty() {
            format!("upstream returned {status}")
        } else {
            format!("upstream returned {status}: {}", truncate_chars(detail, 200))
        };
        fail(tx, target, message);
        return;
    }

    pump_stream(&mut response, cancel, tx, target);
}

/// Reads response bytes through the SSE parser until `[DONE]`, cancellation,
/// connection close or a read error, emitting exactly one terminal event.
fn pump_stream<R: Read>(
    reader: &mut R,
    cancel: &AtomicBool,
    tx: &Sender<StreamEvent>,
    target: StreamTarget,
) {
    let mut parser = SseParser::new();
    let mut buf = [0u8; 8192];
    loop {
        if cancel.load(Ordering::Relaxed) {
            let _ = tx.send(StreamEvent::Interrupted { target });
            return;
        }
        match reader.read(&mut buf) {
            Ok(0) => {
                // Connection closed without the sentinel; whatever buffered
                // tail there is still counts.
                for event in parser.finish() {
                    if dispatch(tx, target, event) {
                        return;
                    }
                }
                let _ = tx.send(StreamEvent::Completed { target });
                return;
            }
            Ok(n) => {
                for event in parser.push(&buf[..n]) {
                    if dispatch(tx, target, event) {
                        return;
                    }
                }
            }
            Err(err) => {
                if cancel.load(Ordering::Relaxed) {
                    let _ = tx.send(StreamEvent::Interrupted { target });
                } else {
                    fail(tx, target, format!("stream read failed: {err}"));
                }
                return;
            }
        }
    }
}

/// Returns true once the terminal event has been sent.
fn dispatch(tx: &Sender<StreamEvent>, target: StreamTarget, event: SseEvent) -> bool {
    match event {
        SseEvent::Delta(text) => {
            let _ = tx.send(StreamEvent::Delta { target, text });
            false
        }
        SseEvent::Done => {
            let _ = tx.send(StreamEvent::Completed { target });
            true
        }
    }
}

fn fail(tx: &Sender<StreamEvent>, target: StreamTarget, message: String) {
    let _ = tx.send(StreamEvent::Failed { target, message });
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars).collect();
    format!("{truncated}…")
}

#[cfg(test)]
#[path = "../tests/unit/api_tests.rs"]
mod tests;
