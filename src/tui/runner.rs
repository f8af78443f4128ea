//! TUI main loop: terminal lifecycle, event multiplexing, and render tick.
//!
//! [`run_tui`] initializes the terminal, spawns the [`Worker`] as a
//! background task, and runs a `tokio::select!` loop that multiplexes worker
//! events, keyboard input, and render ticks.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::EventStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::tui::app_state::AppState;
use crate::tui::input::handle_key_event;
use crate::tui::ui::render_ui;
use crate::worker::{Event, Worker};

/// Run the chat TUI until the user quits.
///
/// The terminal is restored on both normal exit and panic.
pub async fn run_tui(worker: Worker) -> anyhow::Result<()> {
    let speaker = Arc::clone(worker.speaker());
    let mut app_state = AppState::new(
        worker.router().active(),
        worker.router().model_name(),
        speaker.is_enabled(),
    );
    for event in worker.greeting() {
        app_state.apply_event(event);
    }

    let (request_tx, request_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();
    let cancel = CancellationToken::new();

    let worker_task = tokio::spawn(worker.run(request_rx, event_tx, cancel.clone()));

    let mut terminal = ratatui::init();
    let mut key_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(50));

    let result = loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                app_state.apply_event(event);
                if app_state.should_quit {
                    break Ok(());
                }
            }

            Some(Ok(crossterm_event)) = key_stream.next() => {
                if let crossterm::event::Event::Key(key) = crossterm_event
                    && handle_key_event(key, &mut app_state, &request_tx, &speaker)
                {
                    break Ok(());
                }
            }

            _ = tick_interval.tick() => {
                app_state.tts_available = speaker.is_working();
                if let Err(e) = terminal.draw(|frame| render_ui(&app_state, frame)) {
                    break Err(e);
                }
            }
        }
    };

    ratatui::restore();

    cancel.cancel();
    speaker.stop();
    if let Err(e) = worker_task.await {
        tracing::warn!(error = %e, "Worker task ended abnormally");
    }

    result.map_err(Into::into)
}
