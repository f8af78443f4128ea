//! Two-line status bar widget.
//!
//! - Line 1: worker state (colored), model, voice state, turn counter
//! - Line 2: keybind hints for the focused pane

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::tui::app_state::{AppState, Focus};

fn voice_label(state: &AppState) -> (&'static str, Color) {
    if !state.tts_available {
        ("TTS unavailable", Color::Red)
    } else if state.speaking {
        ("Speaking", Color::Magenta)
    } else if state.voice_enabled {
        ("Voice on", Color::Green)
    } else {
        ("Voice off", Color::DarkGray)
    }
}

/// Render the two-line status bar into the given area.
pub fn render_status_bar(state: &AppState, area: Rect, buf: &mut Buffer) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let sep = Span::styled(" | ", Style::default().fg(Color::DarkGray));

    // -- Line 1: Status indicators --
    let (activity, activity_color) = match &state.busy {
        Some(what) => (what.clone(), Color::Yellow),
        None => ("Ready".to_string(), Color::DarkGray),
    };
    let (voice, voice_color) = voice_label(state);

    let line1 = Line::from(vec![
        Span::styled(
            format!(" {activity}"),
            Style::default()
                .fg(activity_color)
                .add_modifier(Modifier::BOLD),
        ),
        sep.clone(),
        Span::raw(format!("Model: {}", state.model_name)),
        sep.clone(),
        Span::styled(voice, Style::default().fg(voice_color)),
        sep,
        Span::raw(format!("Turn {}", state.turn_count)),
    ]);

    // -- Line 2: Keybind hints --
    let hint_style = Style::default().fg(Color::DarkGray);
    let key_style = Style::default().fg(Color::White);

    let mut hints: Vec<(&str, &str)> = vec![("Tab", "switch pane")];
    match state.focus {
        Focus::Sidebar => hints.push(("\u{2191}\u{2193}/Enter", "choose agent")),
        Focus::Input => hints.push(("Enter", "send")),
    }
    hints.extend([
        ("PgUp/PgDn", "scroll"),
        ("^L", "listen"),
        ("^S", "stop voice"),
        ("^T", "voice on/off"),
        ("^N", "new chat"),
        ("^Q", "quit"),
    ]);

    let mut line2_spans = vec![Span::raw(" ")];
    for (i, (key, action)) in hints.into_iter().enumerate() {
        if i > 0 {
            line2_spans.push(Span::styled(" | ", hint_style));
        }
        line2_spans.push(Span::styled(key, key_style));
        line2_spans.push(Span::styled(format!(": {action}"), hint_style));
    }

    Paragraph::new(vec![line1, Line::from(line2_spans)]).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;

    fn rendered(state: &AppState, width: u16) -> String {
        let area = Rect::new(0, 0, width, 2);
        let mut buf = Buffer::empty(area);
        render_status_bar(state, area, &mut buf);
        buf.content().iter().map(|c| c.symbol().to_string()).collect()
    }

    #[test]
    fn render_status_bar_does_not_panic_empty_area() {
        let state = AppState::new(AgentKind::General, "m", true);
        let mut buf = Buffer::empty(Rect::ZERO);
        render_status_bar(&state, Rect::ZERO, &mut buf);
    }

    #[test]
    fn idle_state() {
        let state = AppState::new(AgentKind::General, "gpt-4o", true);
        let content = rendered(&state, 120);
        assert!(content.contains("Ready"));
        assert!(content.contains("Model: gpt-4o"));
        assert!(content.contains("Voice on"));
        assert!(content.contains("Turn 0"));
    }

    #[test]
    fn busy_and_voice_states() {
        let mut state = AppState::new(AgentKind::General, "m", false);
        state.busy = Some("Calculator Agent is thinking...".into());
        assert!(rendered(&state, 120).contains("is thinking"));
        assert!(rendered(&state, 120).contains("Voice off"));

        state.speaking = true;
        state.voice_enabled = true;
        assert!(rendered(&state, 120).contains("Speaking"));

        state.tts_available = false;
        assert!(rendered(&state, 120).contains("TTS unavailable"));
    }

    #[test]
    fn hints_follow_focus() {
        let mut state = AppState::new(AgentKind::General, "m", true);
        assert!(rendered(&state, 160).contains("send"));
        state.focus = Focus::Sidebar;
        assert!(rendered(&state, 160).contains("choose agent"));
        assert!(rendered(&state, 160).contains("quit"));
    }
}
