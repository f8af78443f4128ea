//! Agent picker and the active agent's resource status.

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};

use crate::agents::AgentKind;
use crate::tui::app_state::{AppState, Focus};

pub fn render_sidebar(state: &AppState, area: Rect, buf: &mut Buffer) {
    let [agents_area, info_area] =
        Layout::vertical([Constraint::Length(AgentKind::ALL.len() as u16 + 2), Constraint::Min(0)])
            .areas(area);

    let border_style = if state.focus == Focus::Sidebar {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let lines: Vec<Line<'_>> = AgentKind::ALL
        .iter()
        .enumerate()
        .map(|(i, agent)| {
            let marker = if *agent == state.active_agent { "● " } else { "  " };
            let mut style = Style::default();
            if *agent == state.active_agent {
                style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
            }
            if i == state.sidebar_index && state.focus == Focus::Sidebar {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(Span::styled(format!("{marker}{}", agent.label()), style))
        })
        .collect();

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(" Agents "),
        )
        .render(agents_area, buf);

    let mut info = vec![
        Line::from(Span::styled(
            state.active_agent.description(),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
    ];
    if let Some(status) = &state.agent_status {
        info.push(Line::from(status.as_str()));
    }

    Paragraph::new(info)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Status "))
        .render(info_area, buf);
}
