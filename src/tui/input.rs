//! Keyboard event handler for the TUI.
//!
//! Maps key events to [`AppState`] mutations and worker requests. Called by
//! the main loop in [`super::runner`] whenever a keyboard event arrives from
//! the crossterm `EventStream`.
//!
//! Stopping speech and toggling voice talk to the [`Speaker`] directly so
//! they take effect while the worker is busy with a request.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;

use super::app_state::{AppState, Focus};
use crate::voice::Speaker;

/// Lines moved by PageUp/PageDown.
const PAGE: usize = 10;

/// Process a keyboard event. Returns `true` if the application should exit.
///
/// Only `KeyEventKind::Press` events are processed. This avoids duplicate
/// handling on Windows where key-up events would otherwise trigger actions
/// twice.
pub fn handle_key_event(
    key: KeyEvent,
    state: &mut AppState,
    requests: &UnboundedSender<String>,
    speaker: &Speaker,
) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }

    // -- Quit confirmation mode: intercept keys before normal handling.
    if state.quit_pending {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('q') => true,
            _ => {
                state.quit_pending = false;
                false
            }
        };
    }

    let send = |line: &str| {
        let _ = requests.send(line.to_string());
    };

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return true,
            KeyCode::Char('q') => state.quit_pending = true,
            KeyCode::Char('n') => send("/new"),
            KeyCode::Char('l') => send("/listen"),
            KeyCode::Char('s') => {
                speaker.stop();
                state.speaking = false;
            }
            KeyCode::Char('t') => {
                let enabled = !speaker.is_enabled();
                speaker.set_enabled(enabled);
                if !enabled {
                    speaker.stop();
                }
                state.voice_enabled = enabled;
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Tab | KeyCode::BackTab => state.toggle_focus(),
        KeyCode::PageUp => state.scroll_up(PAGE),
        KeyCode::PageDown => state.scroll_down(PAGE),
        KeyCode::End => state.jump_to_bottom(),
        _ => match state.focus {
            Focus::Sidebar => sidebar_key(key.code, state, &send),
            Focus::Input => input_key(key.code, state, &send),
        },
    }
    false
}

fn sidebar_key(code: KeyCode, state: &mut AppState, send: &impl Fn(&str)) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => state.select_previous_agent(),
        KeyCode::Down | KeyCode::Char('j') => state.select_next_agent(),
        KeyCode::Enter => {
            let agent = state.highlighted_agent();
            if agent != state.active_agent {
                send(&format!("/agent {}", agent.short_name()));
            }
            state.focus = Focus::Input;
        }
        _ => {}
    }
}

fn input_key(code: KeyCode, state: &mut AppState, send: &impl Fn(&str)) {
    match code {
        KeyCode::Char(c) => state.input.push(c),
        KeyCode::Backspace => {
            state.input.pop();
        }
        KeyCode::Esc => state.input.clear(),
        KeyCode::Up => state.scroll_up(1),
        KeyCode::Down => state.scroll_down(1),
        KeyCode::Enter => {
            if let Some(line) = state.take_input() {
                state.push_user(&line);
                send(&line);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use crate::config::PartialConfig;
    use crossterm::event::KeyEventState;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        key(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        key(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn setup() -> (AppState, UnboundedSender<String>, UnboundedReceiver<String>, Speaker) {
        let mut voice = PartialConfig::default().finalize().voice;
        voice.tts_command = vec!["true".into()];
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            AppState::new(AgentKind::General, "m", true),
            tx,
            rx,
            Speaker::new(&voice),
        )
    }

    #[test]
    fn typing_and_enter_sends_the_line() {
        let (mut state, tx, mut rx, speaker) = setup();
        for c in "hi".chars() {
            handle_key_event(press(KeyCode::Char(c)), &mut state, &tx, &speaker);
        }
        handle_key_event(press(KeyCode::Enter), &mut state, &tx, &speaker);
        assert_eq!(rx.try_recv().unwrap(), "hi");
        assert!(state.input.is_empty());
        assert_eq!(state.entries.len(), 1);
    }

    #[test]
    fn backspace_and_escape_edit_input() {
        let (mut state, tx, mut rx, speaker) = setup();
        state.input = "abc".into();
        handle_key_event(press(KeyCode::Backspace), &mut state, &tx, &speaker);
        assert_eq!(state.input, "ab");
        handle_key_event(press(KeyCode::Esc), &mut state, &tx, &speaker);
        assert!(state.input.is_empty());
        handle_key_event(press(KeyCode::Enter), &mut state, &tx, &speaker);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sidebar_enter_switches_agent() {
        let (mut state, tx, mut rx, speaker) = setup();
        handle_key_event(press(KeyCode::Tab), &mut state, &tx, &speaker);
        assert_eq!(state.focus, Focus::Sidebar);
        handle_key_event(press(KeyCode::Up), &mut state, &tx, &speaker);
        handle_key_event(press(KeyCode::Enter), &mut state, &tx, &speaker);
        assert_eq!(rx.try_recv().unwrap(), "/agent calculator");
        assert_eq!(state.focus, Focus::Input);
    }

    #[test]
    fn sidebar_enter_on_active_agent_sends_nothing() {
        let (mut state, tx, mut rx, speaker) = setup();
        state.focus = Focus::Sidebar;
        handle_key_event(press(KeyCode::Enter), &mut state, &tx, &speaker);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn control_shortcuts() {
        let (mut state, tx, mut rx, speaker) = setup();
        handle_key_event(ctrl('n'), &mut state, &tx, &speaker);
        assert_eq!(rx.try_recv().unwrap(), "/new");
        handle_key_event(ctrl('l'), &mut state, &tx, &speaker);
        assert_eq!(rx.try_recv().unwrap(), "/listen");

        handle_key_event(ctrl('t'), &mut state, &tx, &speaker);
        assert!(!state.voice_enabled);
        assert!(!speaker.is_enabled());
        handle_key_event(ctrl('t'), &mut state, &tx, &speaker);
        assert!(speaker.is_enabled());

        // Control chords never reach the input line.
        assert!(state.input.is_empty());
    }

    #[test]
    fn quit_needs_confirmation() {
        let (mut state, tx, _rx, speaker) = setup();
        assert!(!handle_key_event(ctrl('q'), &mut state, &tx, &speaker));
        assert!(state.quit_pending);
        assert!(!handle_key_event(press(KeyCode::Char('n')), &mut state, &tx, &speaker));
        assert!(!state.quit_pending);

        handle_key_event(ctrl('q'), &mut state, &tx, &speaker);
        assert!(handle_key_event(press(KeyCode::Char('y')), &mut state, &tx, &speaker));
    }

    #[test]
    fn ctrl_c_quits_immediately() {
        let (mut state, tx, _rx, speaker) = setup();
        assert!(handle_key_event(ctrl('c'), &mut state, &tx, &speaker));
    }

    #[test]
    fn release_events_are_ignored() {
        let (mut state, tx, _rx, speaker) = setup();
        let mut event = press(KeyCode::Char('x'));
        event.kind = KeyEventKind::Release;
        handle_key_event(event, &mut state, &tx, &speaker);
        assert!(state.input.is_empty());
    }

    #[test]
    fn page_keys_scroll() {
        let (mut state, tx, _rx, speaker) = setup();
        handle_key_event(press(KeyCode::PageUp), &mut state, &tx, &speaker);
        assert_eq!(state.scroll_from_bottom, PAGE);
        handle_key_event(press(KeyCode::End), &mut state, &tx, &speaker);
        assert_eq!(state.scroll_from_bottom, 0);
    }
}
