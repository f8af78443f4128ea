//! Top-level TUI render function.
//!
//! [`render_ui`] is the single entry point called each frame by the main
//! loop. Layout: agent sidebar on the left; transcript, input line and
//! status bar stacked on the right. A quit confirmation dialog overlays
//! everything when pending.

use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};

use crate::tui::app_state::{AppState, Focus};
use crate::tui::widgets::{sidebar, status_bar, transcript};

const SIDEBAR_WIDTH: u16 = 32;

pub fn render_ui(state: &AppState, frame: &mut Frame) {
    let area = frame.area();

    let [body_area, status_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(2)]).areas(area);
    let [sidebar_area, main_area] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .areas(body_area);
    let [transcript_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(main_area);

    let buf = frame.buffer_mut();
    sidebar::render_sidebar(state, sidebar_area, buf);
    transcript::render_transcript(state, transcript_area, buf);
    render_input(state, input_area, buf);
    status_bar::render_status_bar(state, status_area, buf);

    if state.quit_pending {
        render_quit_dialog(area, buf);
    }

    if state.focus == Focus::Input {
        let inner_width = input_area.width.saturating_sub(2);
        let typed = state.input.chars().count() as u16;
        let x = input_area.x + 1 + typed.min(inner_width.saturating_sub(1));
        frame.set_cursor_position((x, input_area.y + 1));
    }
}

fn render_input(state: &AppState, area: Rect, buf: &mut Buffer) {
    let focused = state.focus == Focus::Input;
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let title = if state.busy.is_some() {
        " Message (queued while busy) "
    } else {
        " Message (/help for commands) "
    };

    // Keep the tail of long input visible.
    let visible = area.width.saturating_sub(3) as usize;
    let count = state.input.chars().count();
    let shown: String = state.input.chars().skip(count.saturating_sub(visible)).collect();

    Paragraph::new(shown)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .render(area, buf);
}

/// Render a centered quit confirmation dialog.
fn render_quit_dialog(area: Rect, buf: &mut Buffer) {
    let dialog_width: u16 = 24;
    let dialog_height: u16 = 3;

    let x = area.x + area.width.saturating_sub(dialog_width) / 2;
    let y = area.y + area.height.saturating_sub(dialog_height) / 2;

    let dialog_area = Rect::new(
        x,
        y,
        dialog_width.min(area.width),
        dialog_height.min(area.height),
    );

    Clear.render(dialog_area, buf);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Confirm ")
        .style(Style::default().fg(Color::Red));

    let inner = block.inner(dialog_area);
    block.render(dialog_area, buf);

    if inner.width > 0 && inner.height > 0 {
        let prompt = Paragraph::new(Line::from(vec![
            Span::raw("  Quit? ("),
            Span::styled(
                "y",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("/"),
            Span::styled(
                "n",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw(")"),
        ]));
        prompt.render(inner, buf);
    }
}
