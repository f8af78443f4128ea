//! Application state accumulator for the TUI.
//!
//! [`AppState`] is the single source of truth for everything the TUI draws.
//! Worker events are applied via [`AppState::apply_event`]; key presses
//! mutate it through the focus, input and scroll methods. Each render frame
//! reads from `AppState` (immediate-mode rendering).

use crate::agents::AgentKind;
use crate::worker::Event;

/// Categorizes chat entries for color-coding during rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    /// A tool the agent called while answering.
    ToolCall,
    /// Command results and other system messages.
    Notice,
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    /// Wall-clock time for display (e.g., "14:32:07").
    pub timestamp: String,
    pub kind: EntryKind,
    /// Speaker shown in the header line.
    pub author: String,
    pub text: String,
}

/// Which pane receives arrow keys and Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Input,
}

pub struct AppState {
    // -- Transcript --
    pub entries: Vec<ChatEntry>,
    /// Lines scrolled up from the bottom; 0 follows new messages.
    pub scroll_from_bottom: usize,

    // -- Agents --
    pub active_agent: AgentKind,
    /// Resource line for the active agent (indexed documents, repo, ...).
    pub agent_status: Option<String>,
    /// Highlighted row in the sidebar.
    pub sidebar_index: usize,

    // -- Input --
    pub focus: Focus,
    pub input: String,

    // -- Status bar --
    pub model_name: String,
    /// What the worker is doing, if anything.
    pub busy: Option<String>,
    pub speaking: bool,
    pub voice_enabled: bool,
    /// False once the TTS command has failed.
    pub tts_available: bool,
    pub turn_count: u64,

    /// True after Ctrl+Q; `y` confirms, anything else cancels.
    pub quit_pending: bool,
    /// Set when the worker acknowledged `/quit`.
    pub should_quit: bool,
}

impl AppState {
    pub fn new(active_agent: AgentKind, model_name: &str, voice_enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            scroll_from_bottom: 0,
            active_agent,
            agent_status: None,
            sidebar_index: agent_index(active_agent),
            focus: Focus::Input,
            input: String::new(),
            model_name: model_name.to_string(),
            busy: None,
            speaking: false,
            voice_enabled,
            tts_available: true,
            turn_count: 0,
            quit_pending: false,
            should_quit: false,
        }
    }

    /// Apply a worker event. This is the sole mutation path for
    /// worker-originated state changes.
    pub fn apply_event(&mut self, event: Event) {
        match event {
            Event::Busy(what) => self.busy = Some(what),
            Event::Idle => self.busy = None,
            Event::Transcribed(text) => self.push(EntryKind::User, "You (voice)", text),
            Event::Reply {
                agent,
                text,
                tool_calls,
            } => {
                for call in tool_calls {
                    let summary = format!("{} → {}", call.fn_name, call.result_summary);
                    self.push(EntryKind::ToolCall, "tool", summary);
                }
                self.push(EntryKind::Assistant, agent.label(), text);
                self.turn_count += 1;
            }
            Event::Notice(text) => self.push(EntryKind::Notice, "system", text),
            Event::Error(text) => self.push(EntryKind::Error, "error", text),
            Event::AgentChanged { agent, status } => {
                self.active_agent = agent;
                self.sidebar_index = agent_index(agent);
                self.agent_status = status;
                self.push(
                    EntryKind::Notice,
                    "system",
                    format!("Switched to {}", agent.label()),
                );
            }
            Event::Status(status) => self.agent_status = status,
            Event::ConversationCleared => {
                self.entries.clear();
                self.scroll_from_bottom = 0;
                self.turn_count = 0;
                self.push(EntryKind::Notice, "system", "New chat started.".to_string());
            }
            Event::Speaking(speaking) => self.speaking = speaking,
            Event::VoiceEnabled(enabled) => self.voice_enabled = enabled,
            Event::Quit => self.should_quit = true,
        }
    }

    /// Record a line the user sent. Commands are not echoed.
    pub fn push_user(&mut self, text: &str) {
        if !text.starts_with('/') {
            self.push(EntryKind::User, "You", text.to_string());
        }
    }

    fn push(&mut self, kind: EntryKind, author: &str, text: String) {
        self.entries.push(ChatEntry {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            kind,
            author: author.to_string(),
            text,
        });
        self.scroll_from_bottom = 0;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Sidebar => Focus::Input,
            Focus::Input => Focus::Sidebar,
        };
    }

    pub fn select_previous_agent(&mut self) {
        let n = AgentKind::ALL.len();
        self.sidebar_index = (self.sidebar_index + n - 1) % n;
    }

    pub fn select_next_agent(&mut self) {
        self.sidebar_index = (self.sidebar_index + 1) % AgentKind::ALL.len();
    }

    pub fn highlighted_agent(&self) -> AgentKind {
        AgentKind::ALL[self.sidebar_index % AgentKind::ALL.len()]
    }

    /// Take the input line for sending. Returns `None` when it is blank.
    pub fn take_input(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.input);
        let line = line.trim();
        (!line.is_empty()).then(|| line.to_string())
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn jump_to_bottom(&mut self) {
        self.scroll_from_bottom = 0;
    }
}

fn agent_index(agent: AgentKind) -> usize {
    AgentKind::ALL
        .iter()
        .position(|a| *a == agent)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCallRecord;

    fn state() -> AppState {
        AppState::new(AgentKind::General, "gpt-4o", true)
    }

    #[test]
    fn new_state_defaults() {
        let s = state();
        assert!(s.entries.is_empty());
        assert_eq!(s.focus, Focus::Input);
        assert_eq!(s.sidebar_index, 0);
        assert!(s.busy.is_none());
        assert!(!s.quit_pending);
    }

    #[test]
    fn reply_adds_tool_calls_then_answer() {
        let mut s = state();
        s.apply_event(Event::Reply {
            agent: AgentKind::Calculator,
            text: "4".into(),
            tool_calls: vec![ToolCallRecord {
                fn_name: "add".into(),
                arguments: serde_json::json!({"a": 2, "b": 2}),
                result_summary: "4".into(),
            }],
        });
        assert_eq!(s.entries.len(), 2);
        assert_eq!(s.entries[0].kind, EntryKind::ToolCall);
        assert_eq!(s.entries[0].text, "add → 4");
        assert_eq!(s.entries[1].kind, EntryKind::Assistant);
        assert_eq!(s.entries[1].author, "Calculator Agent");
        assert_eq!(s.turn_count, 1);
    }

    #[test]
    fn agent_change_moves_the_sidebar() {
        let mut s = state();
        s.apply_event(Event::AgentChanged {
            agent: AgentKind::Document,
            status: Some("No documents uploaded".into()),
        });
        assert_eq!(s.active_agent, AgentKind::Document);
        assert_eq!(s.highlighted_agent(), AgentKind::Document);
        assert_eq!(s.agent_status.as_deref(), Some("No documents uploaded"));
    }

    #[test]
    fn clearing_keeps_only_a_notice() {
        let mut s = state();
        s.push_user("hi");
        s.apply_event(Event::Notice("x".into()));
        s.apply_event(Event::ConversationCleared);
        assert_eq!(s.entries.len(), 1);
        assert_eq!(s.entries[0].kind, EntryKind::Notice);
    }

    #[test]
    fn commands_are_not_echoed() {
        let mut s = state();
        s.push_user("/agent calc");
        assert!(s.entries.is_empty());
        s.push_user("hello");
        assert_eq!(s.entries[0].kind, EntryKind::User);
    }

    #[test]
    fn sidebar_selection_wraps() {
        let mut s = state();
        s.select_previous_agent();
        assert_eq!(s.highlighted_agent(), AgentKind::Calculator);
        s.select_next_agent();
        assert_eq!(s.highlighted_agent(), AgentKind::General);
    }

    #[test]
    fn take_input_trims_and_rejects_blank() {
        let mut s = state();
        s.input = "   ".into();
        assert_eq!(s.take_input(), None);
        s.input = " hi ".into();
        assert_eq!(s.take_input().as_deref(), Some("hi"));
        assert!(s.input.is_empty());
    }

    #[test]
    fn new_entries_return_to_bottom() {
        let mut s = state();
        s.scroll_up(5);
        s.scroll_down(2);
        assert_eq!(s.scroll_from_bottom, 3);
        s.apply_event(Event::Notice("n".into()));
        assert_eq!(s.scroll_from_bottom, 0);
    }
}
