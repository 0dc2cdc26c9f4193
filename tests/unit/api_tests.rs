use super::*;

use std::io::{self, Cursor};
use std::sync::mpsc::channel;

use crate::agents::CoachAgent;

fn target() -> StreamTarget {
    StreamTarget {
        agent: CoachAgent::Tennis,
        index: 1,
        epoch: 1,
    }
}

fn sample_stream() -> String {
    concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    )
    .to_string()
}

#[test]
fn pump_stream_emits_deltas_then_completed_on_done() {
    let (tx, rx) = channel();
    let mut reader = Cursor::new(sample_stream());

    pump_stream(&mut reader, &AtomicBool::new(false), &tx, target());

    let events: Vec<StreamEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            StreamEvent::Delta {
                target: target(),
                text: "Hel".to_string()
            },
            StreamEvent::Delta {
                target: target(),
                text: "lo".to_string()
            },
            StreamEvent::Completed { target: target() },
        ]
    );
}

#[test]
fn pump_stream_treats_connection_close_without_done_as_completed() {
    let (tx, rx) = channel();
    let mut reader = Cursor::new(
        "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}\n\n".to_string(),
    );

    pump_stream(&mut reader, &AtomicBool::new(false), &tx, target());

    let events: Vec<StreamEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            StreamEvent::Delta {
                target: target(),
                text: "tail".to_string()
            },
            StreamEvent::Completed { target: target() },
        ]
    );
}

#[test]
fn pump_stream_reports_interrupted_when_cancelled() {
    let (tx, rx) = channel();
    let mut reader = Cursor::new(sample_stream());

    pump_stream(&mut reader, &AtomicBool::new(true), &tx, target());

    let events: Vec<StreamEvent> = rx.try_iter().collect();
    assert_eq!(events, vec![StreamEvent::Interrupted { target: target() }]);
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
    }
}

#[test]
fn pump_stream_reports_read_errors_as_failed() {
    let (tx, rx) = channel();

    pump_stream(&mut FailingReader, &AtomicBool::new(false), &tx, target());

    let events: Vec<StreamEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Failed { target: t, message } => {
            assert_eq!(*t, target());
            assert!(message.contains("reset by peer"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn request_body_puts_the_system_prompt_first_and_streams() {
    let request = ChatRequest {
        target: target(),
        system_prompt: "You are a tennis coach.".to_string(),
        messages: vec![
            OutboundMessage {
                role: "user",
                content: "how do I serve?".to_string(),
            },
            OutboundMessage {
                role: "assistant",
                content: "Toss the ball high.".to_string(),
            },
        ],
    };

    let body = build_request_body("gpt-4", &request);
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["stream"], true);

    let messages = body["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "You are a tennis coach.");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[2]["role"], "assistant");
}

#[test]
fn drain_events_limited_respects_the_cap() {
    let adapter = CompletionAdapter::new(crate::config::ApiConfig::default());
    let tx = adapter.test_sender();
    for _ in 0..5 {
        tx.send(StreamEvent::Completed { target: target() })
            .expect("send event");
    }

    assert!(adapter.drain_events_limited(0).is_empty());
    assert_eq!(adapter.drain_events_limited(3).len(), 3);
    assert_eq!(adapter.drain_events_limited(10).len(), 2);
    assert!(adapter.drain_events_limited(10).is_empty());
}

#[test]
fn cancel_active_flips_the_flag_for_the_running_request() {
    let mut adapter = CompletionAdapter::new(crate::config::ApiConfig::default());
    let flag = Arc::new(AtomicBool::new(false));
    adapter.active_cancel = Some(flag.clone());

    adapter.cancel_active();
    assert!(flag.load(Ordering::Relaxed));
    // A second cancel with nothing in flight is harmless.
    adapter.cancel_active();
}

#[test]
fn truncate_chars_limits_long_upstream_errors() {
    assert_eq!(truncate_chars("short", 10), "short");
    let truncated = truncate_chars(&"x".repeat(300), 5);
    assert_eq!(truncated.chars().count(), 6);
    assert!(truncated.ends_with('…'));
}
