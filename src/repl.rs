//! Line-based chat on stdin/stdout for `chat --headless`.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::worker::{Event, Worker};

/// Text printed for an event, if any.
pub fn format_event(event: &Event) -> Option<String> {
    match event {
        Event::Busy(what) => Some(format!("… {what}")),
        Event::Transcribed(text) => Some(format!("🎙 You said: {text}")),
        Event::Reply {
            agent,
            text,
            tool_calls,
        } => {
            let mut out = String::new();
            for call in tool_calls {
                out.push_str(&format!("  [{}] {}\n", call.fn_name, call.result_summary));
            }
            out.push_str(&format!("{}: {text}", agent.label()));
            Some(out)
        }
        Event::Notice(text) => Some(text.clone()),
        Event::Error(text) => Some(format!("error: {text}")),
        Event::AgentChanged { agent, status } => Some(match status {
            Some(status) => format!("Switched to {}. {status}", agent.label()),
            None => format!("Switched to {}.", agent.label()),
        }),
        Event::ConversationCleared => Some("New chat started.".to_string()),
        Event::VoiceEnabled(true) => Some("🔊 Voice output enabled".to_string()),
        Event::VoiceEnabled(false) => Some("🔇 Voice output disabled".to_string()),
        Event::Idle | Event::Status(_) | Event::Speaking(_) | Event::Quit => None,
    }
}

fn print_pending(events: &mut UnboundedReceiver<Event>) {
    while let Ok(event) = events.try_recv() {
        if let Some(text) = format_event(&event) {
            println!("{text}");
        }
    }
}

/// Read lines until EOF or `/quit`.
pub async fn run_repl(mut worker: Worker) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for event in worker.greeting() {
        let _ = tx.send(event);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let reason = loop {
        print_pending(&mut rx);
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break "eof";
        };
        if !worker.process(&line, &tx).await {
            break "user_quit";
        }
    };

    print_pending(&mut rx);
    worker.shutdown(reason);
    Ok(())
}
