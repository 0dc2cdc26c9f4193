use crate::agents::CoachAgent;

pub const INTERRUPTED_NOTICE: &str = "Response interrupted.";
pub const FAILED_NOTICE_PREFIX: &str = "Response failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    User,
    Coach,
    /// Interrupted/failed status lines. Rendered distinctly and never sent
    /// back upstream as conversation history.
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub origin: MessageOrigin,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            origin: MessageOrigin::User,
            text: text.into(),
        }
    }

    pub fn coach(text: impl Into<String>) -> Self {
        Self {
            origin: MessageOrigin::Coach,
            text: text.into(),
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            origin: MessageOrigin::Notice,
            text: text.into(),
        }
    }
}

/// Identifies the coach message currently receiving streamed fragments.
/// The epoch guards against stale streams: any operation that invalidates an
/// in-flight response bumps the agent's epoch, and events carrying an older
/// epoch are dropped instead of being rerouted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTarget {
    pub agent: CoachAgent,
    pub index: usize,
    pub epoch: u64,
}

/// A message role/content pair ready to be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone)]
struct EditPickerState {
    /// Transcript indices of the user messages that can be edited.
    user_indices: Vec<usize>,
    selected: usize,
}

#[derive(Debug)]
pub struct App {
    pub running: bool,
    pub ticks: u64,
    active_agent: CoachAgent,
    transcripts: [Vec<ChatMessage>; CoachAgent::COUNT],
    epochs: [u64; CoachAgent::COUNT],
    streaming: Option<StreamTarget>,
    chat_input: String,
    chat_cursor: usize,
    chat_scroll: u16,
    edit_picker: Option<EditPickerState>,
    edit_target: Option<usize>,
    stashed_input: Option<(String, usize)>,
}

impl Default for App {
    fn default() -> Self {
        Self::with_agent(CoachAgent::Football)
    }
}

impl App {
    pub fn with_agent(agent: CoachAgent) -> Self {
        Self {
            running: true,
            ticks: 0,
            active_agent: agent,
            transcripts: std::array::from_fn(|_| Vec::new()),
            epochs: [0; CoachAgent::COUNT],
            streaming: None,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            edit_picker: None,
            edit_target: None,
            stashed_input: None,
        }
    }

    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    // --- agent selection ---

    pub fn active_agent(&self) -> CoachAgent {
        self.active_agent
    }

    pub fn next_agent(&mut self) {
        self.set_active_agent(self.active_agent.next());
    }

    pub fn prev_agent(&mut self) {
        self.set_active_agent(self.active_agent.prev());
    }

    /// Switching the slot abandons any edit in progress (the edit referenced
    /// the previous transcript) but leaves in-flight streams alone: their
    /// target still names the old agent, so late fragments keep landing there.
    pub fn set_active_agent(&mut self, agent: CoachAgent) {
        if agent == self.active_agent {
            return;
        }
        self.cancel_edit();
        self.close_edit_picker();
        self.active_agent = agent;
        self.chat_scroll = 0;
    }

    // --- transcripts ---

    pub fn transcript(&self, agent: CoachAgent) -> &[ChatMessage] {
        &self.transcripts[agent.index()]
    }

    pub fn active_messages(&self) -> &[ChatMessage] {
        self.transcript(self.active_agent)
    }

    /// The conversation history to send upstream for `agent`: user and coach
    /// turns only, skipping notices and coach bubbles that never received a
    /// fragment.
    pub fn outbound_messages(&self, agent: CoachAgent) -> Vec<OutboundMessage> {
        self.transcripts[agent.index()]
            .iter()
            .filter_map(|message| match message.origin {
                MessageOrigin::User => Some(OutboundMessage {
                    role: "user",
                    content: message.text.clone(),
                }),
                MessageOrigin::Coach if !message.text.is_empty() => Some(OutboundMessage {
                    role: "assistant",
                    content: message.text.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    // --- streaming reducer ---

    /// Starts a new exchange on the active agent: appends the user message
    /// and an empty coach bubble, and returns the target the stream will
    /// append into. Bumping the epoch invalidates any prior in-flight stream
    /// for this agent (cancel-and-replace, never queue).
    pub fn begin_exchange(&mut self, text: String) -> StreamTarget {
        let agent = self.active_agent;
        let slot = agent.index();
        self.epochs[slot] += 1;
        let transcript = &mut self.transcripts[slot];
        transcript.push(ChatMessage::user(text));
        transcript.push(ChatMessage::coach(String::new()));
        let target = StreamTarget {
            agent,
            index: transcript.len() - 1,
            epoch: self.epochs[slot],
        };
        self.streaming = Some(target);
        target
    }

    fn target_is_current(&self, target: StreamTarget) -> bool {
        self.epochs[target.agent.index()] == target.epoch
    }

    /// Appends a streamed fragment to the targeted coach bubble. Fragments
    /// always follow their target's agent, never the currently selected one,
    /// and stale-epoch fragments are dropped.
    pub fn apply_delta(&mut self, target: StreamTarget, fragment: &str) -> bool {
        if !self.target_is_current(target) {
            return false;
        }
        let Some(message) = self.transcripts[target.agent.index()].get_mut(target.index) else {
            return false;
        };
        message.text.push_str(fragment);
        true
    }

    pub fn finish_stream(&mut self, target: StreamTarget) {
        if self.streaming == Some(target) {
            self.streaming = None;
        }
    }

    /// Records a user-initiated stop: exactly one interrupted notice, prior
    /// fragments left intact. The epoch bump makes the worker's own late
    /// events for this stream no-ops.
    pub fn stop_streaming(&mut self) -> bool {
        let Some(target) = self.streaming.take() else {
            return false;
        };
        let slot = target.agent.index();
        self.epochs[slot] += 1;
        self.transcripts[slot].push(ChatMessage::notice(INTERRUPTED_NOTICE));
        true
    }

    pub fn mark_interrupted(&mut self, target: StreamTarget) -> bool {
        if !self.target_is_current(target) {
            return false;
        }
        self.transcripts[target.agent.index()].push(ChatMessage::notice(INTERRUPTED_NOTICE));
        self.finish_stream(target);
        true
    }

    pub fn mark_failed(&mut self, target: StreamTarget, message: &str) -> bool {
        if !self.target_is_current(target) {
            return false;
        }
        self.transcripts[target.agent.index()]
            .push(ChatMessage::notice(format!("{FAILED_NOTICE_PREFIX}: {message}")));
        self.finish_stream(target);
        true
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    pub fn streaming_target(&self) -> Option<StreamTarget> {
        self.streaming
    }

    // --- input editing ---

    pub fn chat_input(&self) -> &str {
        &self.chat_input
    }

    pub fn chat_cursor(&self) -> usize {
        self.chat_cursor
    }

    pub fn input_char(&mut self, c: char) {
        let byte_idx = char_to_byte_idx(&self.chat_input, self.chat_cursor);
        self.chat_input.insert(byte_idx, c);
        self.chat_cursor = self.chat_cursor.saturating_add(1);
    }

    pub fn backspace_input(&mut self) {
        if self.chat_cursor == 0 {
            return;
        }
        let start = char_to_byte_idx(&self.chat_input, self.chat_cursor.saturating_sub(1));
        let end = char_to_byte_idx(&self.chat_input, self.chat_cursor);
        self.chat_input.drain(start..end);
        self.chat_cursor = self.chat_cursor.saturating_sub(1);
    }

    pub fn move_cursor_left(&mut self) {
        self.chat_cursor = self.chat_cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        let char_len = self.chat_input.chars().count();
        self.chat_cursor = (self.chat_cursor + 1).min(char_len);
    }

    pub fn clear_input(&mut self) {
        self.chat_input.clear();
        self.chat_cursor = 0;
    }

    /// Takes the text to send, if any. In edit mode this first performs the
    /// rewind: the transcript is truncated to everything strictly before the
    /// edited message, and the (possibly empty) edited text decides whether a
    /// resend happens at all.
    pub fn submit(&mut self) -> Option<String> {
        let trimmed = self.chat_input.trim().to_string();

        if let Some(index) = self.edit_target.take() {
            let slot = self.active_agent.index();
            self.transcripts[slot].truncate(index);
            // The truncation invalidates any stream that was appending past
            // the cut; late fragments must not land in the rewound transcript.
            self.epochs[slot] += 1;
            if self
                .streaming
                .is_some_and(|target| target.agent == self.active_agent)
            {
                self.streaming = None;
            }
            self.restore_stashed_input();
            if trimmed.is_empty() {
                return None;
            }
            return Some(trimmed);
        }

        if trimmed.is_empty() {
            return None;
        }
        self.clear_input();
        Some(trimmed)
    }

    // --- edit picker ---

    pub fn open_edit_picker(&mut self) {
        if self.edit_target.is_some() {
            return;
        }
        let user_indices: Vec<usize> = self
            .active_messages()
            .iter()
            .enumerate()
            .filter(|(_, message)| message.origin == MessageOrigin::User)
            .map(|(idx, _)| idx)
            .collect();
        if user_indices.is_empty() {
            return;
        }
        let selected = user_indices.len() - 1;
        self.edit_picker = Some(EditPickerState {
            user_indices,
            selected,
        });
    }

    pub fn close_edit_picker(&mut self) {
        self.edit_picker = None;
    }

    pub fn is_edit_picker_open(&self) -> bool {
        self.edit_picker.is_some()
    }

    pub fn edit_picker_move_up(&mut self) {
        if let Some(picker) = self.edit_picker.as_mut() {
            picker.selected = picker.selected.saturating_sub(1);
        }
    }

    pub fn edit_picker_move_down(&mut self) {
        if let Some(picker) = self.edit_picker.as_mut() {
            picker.selected = (picker.selected + 1).min(picker.user_indices.len() - 1);
        }
    }

    pub fn edit_picker_selected(&self) -> Option<usize> {
        self.edit_picker.as_ref().map(|picker| picker.selected)
    }

    /// The editable messages as (transcript index, text) pairs, for the
    /// picker overlay.
    pub fn edit_picker_entries(&self) -> Vec<(usize, &str)> {
        let Some(picker) = self.edit_picker.as_ref() else {
            return Vec::new();
        };
        picker
            .user_indices
            .iter()
            .map(|&idx| (idx, self.active_messages()[idx].text.as_str()))
            .collect()
    }

    /// Loads the selected user message into the input box for editing,
    /// stashing whatever was being typed.
    pub fn confirm_edit_pick(&mut self) {
        let Some(picker) = self.edit_picker.take() else {
            return;
        };
        let index = picker.user_indices[picker.selected];
        let text = self.active_messages()[index].text.clone();
        self.stashed_input = Some((
            std::mem::take(&mut self.chat_input),
            std::mem::replace(&mut self.chat_cursor, 0),
        ));
        self.chat_cursor = text.chars().count();
        self.chat_input = text;
        self.edit_target = Some(index);
    }

    pub fn is_editing(&self) -> bool {
        self.edit_target.is_some()
    }

    pub fn editing_index(&self) -> Option<usize> {
        self.edit_target
    }

    pub fn cancel_edit(&mut self) {
        if self.edit_target.take().is_some() {
            self.restore_stashed_input();
        }
    }

    fn restore_stashed_input(&mut self) {
        let (input, cursor) = self.stashed_input.take().unwrap_or_default();
        self.chat_input = input;
        self.chat_cursor = cursor;
    }

    // --- chat scrolling ---

    pub fn chat_scroll(&self) -> u16 {
        self.chat_scroll
    }

    pub fn set_chat_scroll(&mut self, scroll: u16) {
        self.chat_scroll = scroll;
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self, max_scroll: u16) {
        self.chat_scroll = (self.chat_scroll + 1).min(max_scroll);
    }
}

fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
