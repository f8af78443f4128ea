//! Conversation state, slash commands and the session transcript.

pub mod commands;
pub mod conversation;
pub mod transcript_log;

pub use commands::{Command, HELP_TEXT, Input, parse_input};
pub use conversation::{Conversation, Role, Turn};
pub use transcript_log::{LogEntry, TranscriptLogger};
