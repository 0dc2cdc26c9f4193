use super::*;
use crate::agents::CoachAgent;

fn finished_exchange(app: &mut App, question: &str, answer: &str) {
    let target = app.begin_exchange(question.to_string());
    assert!(app.apply_delta(target, answer));
    app.finish_stream(target);
}

#[test]
fn default_state_is_running_with_empty_transcripts() {
    let app = App::default();
    assert!(app.running);
    assert_eq!(app.ticks, 0);
    assert_eq!(app.active_agent(), CoachAgent::Football);
    for agent in CoachAgent::ALL {
        assert!(app.transcript(agent).is_empty());
    }
    assert!(app.chat_input().is_empty());
    assert!(!app.is_streaming());
}

#[test]
fn begin_exchange_appends_user_message_and_empty_coach_bubble() {
    let mut app = App::default();
    let target = app.begin_exchange("how do I serve?".to_string());

    let messages = app.active_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], ChatMessage::user("how do I serve?"));
    assert_eq!(messages[1], ChatMessage::coach(""));
    assert_eq!(target.agent, CoachAgent::Football);
    assert_eq!(target.index, 1);
    assert!(app.is_streaming());
}

#[test]
fn deltas_append_to_the_target_bubble_in_arrival_order() {
    let mut app = App::default();
    let target = app.begin_exchange("hi".to_string());

    assert!(app.apply_delta(target, "Hel"));
    assert!(app.apply_delta(target, "lo"));
    assert_eq!(app.active_messages()[1].text, "Hello");
}

#[test]
fn a_new_send_invalidates_the_prior_stream_for_that_agent() {
    let mut app = App::default();
    let stale = app.begin_exchange("first".to_string());
    assert!(app.apply_delta(stale, "partial"));

    let fresh = app.begin_exchange("second".to_string());
    assert!(!app.apply_delta(stale, "ghost"));
    assert!(app.apply_delta(fresh, "real"));

    let messages = app.active_messages();
    assert_eq!(messages[1].text, "partial");
    assert_eq!(messages[3].text, "real");
}

#[test]
fn switching_agents_does_not_reroute_late_fragments() {
    let mut app = App::default();
    let target = app.begin_exchange("question".to_string());

    app.set_active_agent(CoachAgent::Tennis);
    assert!(app.apply_delta(target, "late fragment"));

    assert!(app.transcript(CoachAgent::Tennis).is_empty());
    assert_eq!(
        app.transcript(CoachAgent::Football)[1].text,
        "late fragment"
    );
}

#[test]
fn operating_on_one_agent_never_touches_another_transcript() {
    let mut app = App::default();
    finished_exchange(&mut app, "football q", "football a");

    app.set_active_agent(CoachAgent::Boxing);
    finished_exchange(&mut app, "boxing q", "boxing a");

    assert_eq!(app.transcript(CoachAgent::Football).len(), 2);
    assert_eq!(app.transcript(CoachAgent::Football)[0].text, "football q");
    assert_eq!(app.transcript(CoachAgent::Boxing)[1].text, "boxing a");
    assert!(app.transcript(CoachAgent::Tennis).is_empty());
}

#[test]
fn stop_streaming_keeps_partial_text_and_appends_one_notice() {
    let mut app = App::default();
    let target = app.begin_exchange("hi".to_string());
    assert!(app.apply_delta(target, "partial answer"));

    assert!(app.stop_streaming());
    let messages = app.active_messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].text, "partial answer");
    assert_eq!(messages[2], ChatMessage::notice(INTERRUPTED_NOTICE));
    assert!(!app.is_streaming());

    // The worker's own interrupted event arrives later with a stale epoch
    // and must not add a second notice.
    assert!(!app.mark_interrupted(target));
    assert_eq!(app.active_messages().len(), 3);
}

#[test]
fn stop_streaming_without_a_stream_is_a_no_op() {
    let mut app = App::default();
    assert!(!app.stop_streaming());
    assert!(app.active_messages().is_empty());
}

#[test]
fn failed_stream_appends_a_distinguishable_notice() {
    let mut app = App::default();
    let target = app.begin_exchange("hi".to_string());
    assert!(app.apply_delta(target, "some text"));

    assert!(app.mark_failed(target, "connection reset"));
    let messages = app.active_messages();
    assert_eq!(messages[1].text, "some text");
    assert_eq!(messages[2].origin, MessageOrigin::Notice);
    assert!(messages[2].text.starts_with(FAILED_NOTICE_PREFIX));
    assert!(messages[2].text.contains("connection reset"));
    assert_ne!(messages[2].text, INTERRUPTED_NOTICE);
    assert!(!app.is_streaming());
}

#[test]
fn transcript_is_append_only_between_exchanges() {
    let mut app = App::default();
    finished_exchange(&mut app, "q1", "a1");
    let before: Vec<ChatMessage> = app.active_messages().to_vec();

    finished_exchange(&mut app, "q2", "a2");
    assert_eq!(&app.active_messages()[..before.len()], before.as_slice());
}

#[test]
fn edit_picker_lists_only_user_messages_latest_selected() {
    let mut app = App::default();
    finished_exchange(&mut app, "q1", "a1");
    finished_exchange(&mut app, "q2", "a2");

    app.open_edit_picker();
    assert!(app.is_edit_picker_open());
    let entries = app.edit_picker_entries();
    assert_eq!(entries, vec![(0, "q1"), (2, "q2")]);
    assert_eq!(app.edit_picker_selected(), Some(1));

    app.edit_picker_move_up();
    assert_eq!(app.edit_picker_selected(), Some(0));
    app.edit_picker_move_up();
    assert_eq!(app.edit_picker_selected(), Some(0));
    app.edit_picker_move_down();
    assert_eq!(app.edit_picker_selected(), Some(1));
}

#[test]
fn edit_picker_does_not_open_on_an_empty_transcript() {
    let mut app = App::default();
    app.open_edit_picker();
    assert!(!app.is_edit_picker_open());
}

#[test]
fn confirming_a_pick_loads_the_message_and_stashes_typed_input() {
    let mut app = App::default();
    finished_exchange(&mut app, "original question", "answer");
    for c in "draft".chars() {
        app.input_char(c);
    }

    app.open_edit_picker();
    app.confirm_edit_pick();

    assert!(!app.is_edit_picker_open());
    assert!(app.is_editing());
    assert_eq!(app.editing_index(), Some(0));
    assert_eq!(app.chat_input(), "original question");
    assert_eq!(app.chat_cursor(), "original question".chars().count());

    app.cancel_edit();
    assert!(!app.is_editing());
    assert_eq!(app.chat_input(), "draft");
}

#[test]
fn saving_an_edit_truncates_to_strictly_before_the_edited_index() {
    let mut app = App::default();
    finished_exchange(&mut app, "q1", "a1");
    finished_exchange(&mut app, "q2", "a2");
    finished_exchange(&mut app, "q3", "a3");
    assert_eq!(app.active_messages().len(), 6);

    app.open_edit_picker();
    app.edit_picker_move_up(); // select q2 at transcript index 2
    app.confirm_edit_pick();
    app.backspace_input();
    app.input_char('X');

    let resend = app.submit();
    assert_eq!(resend, Some("qX".to_string()));
    // Rewound to everything strictly before index 2, before the resend
    // appends anything.
    assert_eq!(app.active_messages().len(), 2);
    assert_eq!(app.active_messages()[0].text, "q1");
    assert!(!app.is_editing());
    assert!(app.chat_input().is_empty());
}

#[test]
fn saving_an_empty_edit_truncates_without_resending() {
    let mut app = App::default();
    finished_exchange(&mut app, "q1", "a1");

    app.open_edit_picker();
    app.confirm_edit_pick();
    for _ in 0.."q1".len() {
        app.backspace_input();
    }

    assert_eq!(app.submit(), None);
    assert!(app.active_messages().is_empty());
}

#[test]
fn editing_mid_stream_drops_the_rewound_streams_fragments() {
    let mut app = App::default();
    finished_exchange(&mut app, "q1", "a1");
    let target = app.begin_exchange("q2".to_string());
    assert!(app.apply_delta(target, "partial"));

    app.open_edit_picker();
    app.edit_picker_move_up(); // q1 at index 0
    app.confirm_edit_pick();
    let resend = app.submit();
    assert_eq!(resend, Some("q1".to_string()));

    assert!(app.active_messages().is_empty());
    assert!(!app.is_streaming());
    assert!(!app.apply_delta(target, "ghost"));
    assert!(app.active_messages().is_empty());
}

#[test]
fn switching_agents_cancels_a_pending_edit() {
    let mut app = App::default();
    finished_exchange(&mut app, "q1", "a1");
    app.open_edit_picker();
    app.confirm_edit_pick();
    assert!(app.is_editing());

    app.set_active_agent(CoachAgent::Tennis);
    assert!(!app.is_editing());
    assert!(!app.is_edit_picker_open());
}

#[test]
fn submit_trims_input_and_rejects_blank_sends() {
    let mut app = App::default();
    for c in "  hello  ".chars() {
        app.input_char(c);
    }
    assert_eq!(app.submit(), Some("hello".to_string()));
    assert!(app.chat_input().is_empty());

    for c in "   ".chars() {
        app.input_char(c);
    }
    assert_eq!(app.submit(), None);
}

#[test]
fn input_editing_handles_multibyte_chars() {
    let mut app = App::default();
    for c in "héllo".chars() {
        app.input_char(c);
    }
    app.move_cursor_left();
    app.backspace_input();
    assert_eq!(app.chat_input(), "hélo");

    app.move_cursor_right();
    app.input_char('!');
    assert_eq!(app.chat_input(), "hélo!");
    app.clear_input();
    assert!(app.chat_input().is_empty());
    assert_eq!(app.chat_cursor(), 0);
}

#[test]
fn outbound_messages_carry_roles_and_skip_notices_and_empty_bubbles() {
    let mut app = App::default();
    finished_exchange(&mut app, "q1", "a1");
    let target = app.begin_exchange("q2".to_string());
    app.stop_streaming();
    let _ = target;

    let outbound = app.outbound_messages(CoachAgent::Football);
    assert_eq!(
        outbound,
        vec![
            OutboundMessage {
                role: "user",
                content: "q1".to_string()
            },
            OutboundMessage {
                role: "assistant",
                content: "a1".to_string()
            },
            OutboundMessage {
                role: "user",
                content: "q2".to_string()
            },
        ]
    );
}

#[test]
fn agent_cycling_wraps_in_both_directions() {
    let mut app = App::default();
    app.prev_agent();
    assert_eq!(app.active_agent(), CoachAgent::FormulaOne);
    app.next_agent();
    assert_eq!(app.active_agent(), CoachAgent::Football);
}

#[test]
fn chat_scroll_saturates_at_bounds() {
    let mut app = App::default();
    app.scroll_chat_up();
    assert_eq!(app.chat_scroll(), 0);
    app.scroll_chat_down(2);
    app.scroll_chat_down(2);
    app.scroll_chat_down(2);
    assert_eq!(app.chat_scroll(), 2);
    app.set_chat_scroll(7);
    assert_eq!(app.chat_scroll(), 7);
}
