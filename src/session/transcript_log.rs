//! JSONL transcript of a chat session.
//!
//! Each session writes `session-{timestamp}.jsonl` under `<data_dir>/logs/`,
//! one self-describing event per line, flushed after every write.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::agents::AgentKind;
use crate::llm::ToolCallRecord;

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LogEntry {
    SessionStart {
        timestamp: String,
        session_id: String,
        model: String,
        agent: AgentKind,
    },

    AgentSelected {
        timestamp: String,
        agent: AgentKind,
    },

    /// One user input and the reply it produced.
    Turn {
        timestamp: String,
        turn: u64,
        agent: AgentKind,
        user: String,
        reply: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRecord>,
    },

    /// Status messages shown outside a turn (uploads, validation, errors).
    Notice {
        timestamp: String,
        message: String,
    },

    SessionEnd {
        timestamp: String,
        total_turns: u64,
        reason: String,
    },
}

pub struct TranscriptLogger {
    writer: BufWriter<fs::File>,
    log_path: PathBuf,
    session_id: String,
    turns: u64,
}

impl TranscriptLogger {
    /// Create `logs_dir` if needed and open a new session file in it.
    pub fn new(logs_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(logs_dir)?;

        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
        let session_id = uuid::Uuid::new_v4().to_string();
        // Two sessions started in the same second must not share a file.
        let log_path = logs_dir.join(format!("session-{stamp}-{}.jsonl", &session_id[..8]));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path,
            session_id,
            turns: 0,
        })
    }

    pub fn log_event(&mut self, event: &LogEntry) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_session_start(&mut self, model: &str, agent: AgentKind) -> anyhow::Result<()> {
        let session_id = self.session_id.clone();
        self.log_event(&LogEntry::SessionStart {
            timestamp: now_iso(),
            session_id,
            model: model.to_string(),
            agent,
        })
    }

    pub fn log_agent_selected(&mut self, agent: AgentKind) -> anyhow::Result<()> {
        self.log_event(&LogEntry::AgentSelected {
            timestamp: now_iso(),
            agent,
        })
    }

    pub fn log_turn(
        &mut self,
        agent: AgentKind,
        user: &str,
        reply: &str,
        tool_calls: &[ToolCallRecord],
    ) -> anyhow::Result<()> {
        self.turns += 1;
        let turn = self.turns;
        self.log_event(&LogEntry::Turn {
            timestamp: now_iso(),
            turn,
            agent,
            user: user.to_string(),
            reply: reply.to_string(),
            tool_calls: tool_calls.to_vec(),
        })
    }

    pub fn log_notice(&mut self, message: &str) -> anyhow::Result<()> {
        self.log_event(&LogEntry::Notice {
            timestamp: now_iso(),
            message: message.to_string(),
        })
    }

    pub fn log_session_end(&mut self, reason: &str) -> anyhow::Result<()> {
        let total_turns = self.turns;
        self.log_event(&LogEntry::SessionEnd {
            timestamp: now_iso(),
            total_turns,
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        let file = fs::File::open(path).expect("open log");
        std::io::BufReader::new(file)
            .lines()
            .map(|l| serde_json::from_str(&l.expect("read line")).expect("valid JSON"))
            .collect()
    }

    #[test]
    fn creates_session_file_in_logs_dir() {
        let tmp = TempDir::new().unwrap();
        let logs = tmp.path().join("logs");
        let logger = TranscriptLogger::new(&logs).unwrap();

        assert!(logger.log_path().starts_with(&logs));
        let name = logger.log_path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("session-"));
        assert!(name.ends_with(".jsonl"));
        assert_eq!(logger.session_id().len(), 36);
    }

    #[test]
    fn full_session_is_replayable() {
        let tmp = TempDir::new().unwrap();
        let mut logger = TranscriptLogger::new(tmp.path()).unwrap();

        logger
            .log_session_start("gpt-4.1-mini", AgentKind::General)
            .unwrap();
        logger.log_agent_selected(AgentKind::Calculator).unwrap();
        logger
            .log_turn(
                AgentKind::Calculator,
                "2+2",
                "4",
                &[ToolCallRecord {
                    fn_name: "calculate".into(),
                    arguments: serde_json::json!({"expression": "2+2"}),
                    result_summary: "{\"result\":\"4\"}".into(),
                }],
            )
            .unwrap();
        logger.log_turn(AgentKind::Calculator, "thanks", "You're welcome", &[]).unwrap();
        logger.log_notice("Voice output disabled").unwrap();
        logger.log_session_end("user_quit").unwrap();

        let lines = read_lines(logger.log_path());
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0]["event_type"], "session_start");
        assert_eq!(lines[0]["agent"], "general");
        assert_eq!(lines[1]["event_type"], "agent_selected");
        assert_eq!(lines[1]["agent"], "calculator");
        assert_eq!(lines[2]["turn"], 1);
        assert_eq!(lines[2]["tool_calls"][0]["fn_name"], "calculate");
        assert!(lines[3].get("tool_calls").is_none());
        assert_eq!(lines[4]["message"], "Voice output disabled");
        assert_eq!(lines[5]["total_turns"], 2);
    }
}
