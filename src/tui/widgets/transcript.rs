//! Chat transcript rendering widget.
//!
//! Each [`ChatEntry`] becomes a color-coded header line (author + timestamp)
//! followed by its indented, wrapped text. The view is anchored to the
//! bottom; [`AppState::scroll_from_bottom`] moves it up.

use ratatui::buffer::Buffer;
use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
    Widget,
};

use crate::tui::app_state::{AppState, ChatEntry, EntryKind};

fn kind_style(kind: EntryKind) -> Style {
    match kind {
        EntryKind::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        EntryKind::Assistant => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        EntryKind::ToolCall => Style::default().fg(Color::Yellow),
        EntryKind::Notice => Style::default().fg(Color::Magenta),
        EntryKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn build_lines(entries: &[ChatEntry], area_width: u16) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let content_width = (area_width as usize).saturating_sub(4);

    for entry in entries {
        let style = kind_style(entry.kind);
        lines.push(Line::from(vec![
            Span::styled(entry.author.clone(), style),
            Span::styled(
                format!("  {}", entry.timestamp),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        let body_style = match entry.kind {
            EntryKind::ToolCall => Style::default().fg(Color::DarkGray),
            EntryKind::Error => Style::default().fg(Color::Red),
            _ => Style::default(),
        };
        for content_line in entry.text.lines() {
            for w in wrap_text(content_line, content_width) {
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(w, body_style),
                ]));
            }
        }
        lines.push(Line::from(""));
    }

    lines
}

/// Wrap at word boundaries where possible, breaking long words by char.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }
    let mut result = Vec::new();
    let mut current = String::new();
    let mut width = 0;

    for word in text.split(' ') {
        let mut word_width = word.chars().count();
        if width > 0 && width + 1 + word_width > max_width {
            result.push(std::mem::take(&mut current));
            width = 0;
        }
        if width > 0 {
            current.push(' ');
            width += 1;
        }
        let mut rest = word;
        while word_width > max_width - width {
            let take = max_width - width;
            let split = rest
                .char_indices()
                .nth(take)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            current.push_str(&rest[..split]);
            result.push(std::mem::take(&mut current));
            rest = &rest[split..];
            word_width -= take;
            width = 0;
        }
        current.push_str(rest);
        width += word_width;
    }
    result.push(current);
    result
}

/// Render the transcript into `area` with a bordered block and scrollbar.
pub fn render_transcript(state: &AppState, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", state.active_agent.label()));

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let lines = build_lines(&state.entries, inner.width);
    let total_lines = lines.len();
    let max_offset = total_lines.saturating_sub(inner.height as usize);
    let line_offset = max_offset.saturating_sub(state.scroll_from_bottom);

    Paragraph::new(lines)
        .scroll((line_offset as u16, 0))
        .render(inner, buf);

    if max_offset > 0 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("\u{2191}"))
            .end_symbol(Some("\u{2193}"));
        let mut scrollbar_state = ScrollbarState::new(max_offset).position(line_offset);
        StatefulWidget::render(
            scrollbar,
            inner.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            buf,
            &mut scrollbar_state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentKind;
    use crate::worker::Event;

    fn rendered(state: &AppState, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        render_transcript(state, area, &mut buf);
        buf.content().iter().map(|c| c.symbol().to_string()).collect()
    }

    #[test]
    fn wrap_prefers_word_boundaries() {
        assert_eq!(wrap_text("hello big world", 9), vec!["hello big", "world"]);
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_text("", 5), vec![""]);
    }

    #[test]
    fn wrap_is_char_safe() {
        let wrapped = wrap_text("ééééé", 2);
        assert_eq!(wrapped, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn shows_entries_with_authors() {
        let mut state = AppState::new(AgentKind::General, "m", true);
        state.push_user("what is rust?");
        state.apply_event(Event::Reply {
            agent: AgentKind::General,
            text: "A systems language.".into(),
            tool_calls: vec![],
        });
        let content = rendered(&state, 60, 12);
        assert!(content.contains("You"));
        assert!(content.contains("what is rust?"));
        assert!(content.contains("General Chat"));
        assert!(content.contains("A systems language."));
    }

    #[test]
    fn anchors_to_the_latest_message() {
        let mut state = AppState::new(AgentKind::General, "m", true);
        for i in 0..20 {
            state.apply_event(Event::Notice(format!("message {i}")));
        }
        let content = rendered(&state, 40, 8);
        assert!(content.contains("message 19"));
        assert!(!content.contains("message 0 "));

        state.scroll_up(1000);
        let content = rendered(&state, 40, 8);
        assert!(content.contains("message 0"));
        assert!(!content.contains("message 19"));
    }
}
