//! The task that owns the router.
//!
//! Front-ends send raw input lines; the worker parses slash commands, runs
//! one request at a time and reports back through [`Event`]s. Speech runs
//! in its own task so the front-end can stop it.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::agents::{AgentKind, Router};
use crate::config::credentials::NO_API_KEY_MESSAGE;
use crate::llm::ToolCallRecord;
use crate::session::{Command, HELP_TEXT, Input, TranscriptLogger, parse_input};
use crate::voice::{Listener, SpeechOutcome, Speaker, TEST_PHRASE};

#[derive(Debug, Clone)]
pub enum Event {
    /// Work started; the text says what is happening.
    Busy(String),
    Idle,
    /// Text recognised from the microphone, shown as the user's message.
    Transcribed(String),
    Reply {
        agent: AgentKind,
        text: String,
        tool_calls: Vec<ToolCallRecord>,
    },
    Notice(String),
    Error(String),
    AgentChanged {
        agent: AgentKind,
        status: Option<String>,
    },
    /// Resource line for the active agent changed (upload, clone, init).
    Status(Option<String>),
    ConversationCleared,
    Speaking(bool),
    VoiceEnabled(bool),
    Quit,
}

pub struct Worker {
    router: Router,
    speaker: Arc<Speaker>,
    listener: Listener,
    transcript: Option<TranscriptLogger>,
    has_model: bool,
}

impl Worker {
    pub fn new(
        router: Router,
        speaker: Arc<Speaker>,
        listener: Listener,
        mut transcript: Option<TranscriptLogger>,
        has_model: bool,
    ) -> Self {
        if let Some(log) = transcript.as_mut()
            && let Err(e) = log.log_session_start(router.model_name(), router.active())
        {
            tracing::warn!(error = %e, "Failed to write transcript");
        }
        Self {
            router,
            speaker,
            listener,
            transcript,
            has_model,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn speaker(&self) -> &Arc<Speaker> {
        &self.speaker
    }

    /// Messages shown when the session opens.
    pub fn greeting(&self) -> Vec<Event> {
        let mut events = vec![
            Event::AgentChanged {
                agent: self.router.active(),
                status: self.router.resource_status(),
            },
            Event::Notice(format!(
                "🦙 Welcome to ASK LLAMA. Active agent: {}. Type /help for commands.",
                self.router.active().label()
            )),
        ];
        if !self.has_model {
            events.push(Event::Error(NO_API_KEY_MESSAGE.to_string()));
        }
        events
    }

    /// Receive lines until the channel closes or `cancel` fires.
    pub async fn run(
        mut self,
        mut requests: UnboundedReceiver<String>,
        events: UnboundedSender<Event>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                line = requests.recv() => match line {
                    Some(line) => {
                        // An in-flight request is dropped on cancellation.
                        let keep_going = tokio::select! {
                            _ = cancel.cancelled() => false,
                            keep = self.process(&line, &events) => keep,
                        };
                        if !keep_going {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        self.shutdown("user_quit");
    }

    /// Handle one input line. Returns false once the user asked to quit.
    pub async fn process(&mut self, line: &str, events: &UnboundedSender<Event>) -> bool {
        let send = |event: Event| {
            let _ = events.send(event);
        };

        let input = match parse_input(line) {
            Ok(input) => input,
            Err(usage) => {
                send(Event::Notice(usage));
                return true;
            }
        };

        match input {
            Input::Message(text) if text.is_empty() => {}
            Input::Message(text) => self.chat(&text, events).await,
            Input::Command(command) => return self.command(command, events).await,
        }
        true
    }

    async fn chat(&mut self, text: &str, events: &UnboundedSender<Event>) {
        let agent = self.router.active();
        let _ = events.send(Event::Busy(format!("{} is thinking...", agent.label())));
        let reply = self.router.handle(text).await;

        if let Some(log) = self.transcript.as_mut()
            && let Err(e) = log.log_turn(agent, text, &reply.text, &reply.tool_calls)
        {
            tracing::warn!(error = %e, "Failed to write transcript");
        }

        let _ = events.send(Event::Reply {
            agent,
            text: reply.text.clone(),
            tool_calls: reply.tool_calls,
        });
        let _ = events.send(Event::Status(self.router.resource_status()));
        let _ = events.send(Event::Idle);
        self.speak(reply.text, events.clone());
    }

    async fn command(&mut self, command: Command, events: &UnboundedSender<Event>) -> bool {
        let send = |event: Event| {
            let _ = events.send(event);
        };

        match command {
            Command::Agent(kind) => self.select_agent(kind, events),
            Command::Upload(paths) => {
                self.select_agent(AgentKind::Document, events);
                send(Event::Busy("📄 Processing documents...".into()));
                let message = self.router.upload_documents(&paths).await;
                self.notice(&message, events);
                send(Event::Status(self.router.resource_status()));
                send(Event::Idle);
            }
            Command::Repo(url) => {
                self.select_agent(AgentKind::RepoQa, events);
                send(Event::Busy("📂 Cloning and indexing repository...".into()));
                let message = self.router.process_repository(&url).await;
                self.notice(&message, events);
                send(Event::Status(self.router.resource_status()));
                send(Event::Idle);
            }
            Command::Modify(url) => {
                self.select_agent(AgentKind::RepoModifier, events);
                send(Event::Busy("⚡ Validating repository access...".into()));
                let message = self.router.init_modifier(&url).await;
                self.notice(&message, events);
                send(Event::Status(self.router.resource_status()));
                send(Event::Idle);
            }
            Command::ResetModifier => {
                let message = self.router.reset_modifier();
                self.notice(&message, events);
                send(Event::Status(self.router.resource_status()));
            }
            Command::Validate(url) => {
                send(Event::Busy("Checking GitHub access...".into()));
                let report = self.router.validate(url.as_deref()).await;
                send(Event::Notice(report));
                send(Event::Idle);
            }
            Command::Repos => {
                send(Event::Busy("Listing repositories...".into()));
                send(Event::Notice(self.router.list_repositories().await));
                send(Event::Idle);
            }
            Command::NewChat => {
                self.router.new_chat();
                send(Event::ConversationCleared);
            }
            Command::Voice(enabled) => {
                self.speaker.set_enabled(enabled);
                if !enabled {
                    self.speaker.stop();
                }
                send(Event::VoiceEnabled(enabled));
            }
            Command::Listen => self.listen(events).await,
            Command::Stop => {
                if self.speaker.stop() {
                    send(Event::Notice("🔇 Voice stopped!".into()));
                }
                send(Event::Speaking(false));
            }
            Command::TestVoice => {
                if !self.speaker.is_enabled() {
                    send(Event::Notice("🔇 Voice output is disabled".into()));
                } else {
                    self.speak(TEST_PHRASE.to_string(), events.clone());
                }
            }
            Command::Help => send(Event::Notice(HELP_TEXT.to_string())),
            Command::Quit => {
                send(Event::Quit);
                return false;
            }
        }
        true
    }

    fn select_agent(&mut self, kind: AgentKind, events: &UnboundedSender<Event>) {
        if kind == self.router.active() {
            return;
        }
        self.router.select_agent(kind);
        if let Some(log) = self.transcript.as_mut()
            && let Err(e) = log.log_agent_selected(kind)
        {
            tracing::warn!(error = %e, "Failed to write transcript");
        }
        let _ = events.send(Event::AgentChanged {
            agent: kind,
            status: self.router.resource_status(),
        });
    }

    async fn listen(&mut self, events: &UnboundedSender<Event>) {
        let _ = events.send(Event::Busy("🎙 Listening... Speak now!".into()));
        match self.listener.listen().await {
            Ok(text) => {
                let _ = events.send(Event::Transcribed(text.clone()));
                self.chat(&text, events).await;
            }
            Err(e) => {
                tracing::info!(error = %e, "Voice input failed");
                let _ = events.send(Event::Error(e.to_string()));
                let _ = events.send(Event::Idle);
            }
        }
    }

    fn notice(&mut self, message: &str, events: &UnboundedSender<Event>) {
        if let Some(log) = self.transcript.as_mut()
            && let Err(e) = log.log_notice(message)
        {
            tracing::warn!(error = %e, "Failed to write transcript");
        }
        let event = if message.starts_with('❌') {
            Event::Error(message.to_string())
        } else {
            Event::Notice(message.to_string())
        };
        let _ = events.send(event);
    }

    fn speak(&self, text: String, events: UnboundedSender<Event>) {
        if !self.speaker.is_enabled() || !self.speaker.is_working() {
            return;
        }
        let speaker = self.speaker.clone();
        tokio::spawn(async move {
            let _ = events.send(Event::Speaking(true));
            match speaker.speak(&text).await {
                Ok(SpeechOutcome::AlreadySpeaking) => {
                    let notice = "🔁 Already speaking. Please wait.".to_string();
                    let _ = events.send(Event::Notice(notice));
                }
                Ok(_) => {}
                Err(e) => {
                    let _ = events.send(Event::Error(format!("{e}. Voice output disabled.")));
                }
            }
            // Another utterance may still be playing.
            let _ = events.send(Event::Speaking(speaker.is_speaking()));
        });
    }

    /// Stop speech and close the transcript.
    pub fn shutdown(mut self, reason: &str) {
        self.speaker.stop();
        if let Some(log) = self.transcript.as_mut()
            && let Err(e) = log.log_session_end(reason)
        {
            tracing::warn!(error = %e, "Failed to write transcript");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Services;
    use crate::config::PartialConfig;
    use crate::testing::ScriptedChatModel;

    fn worker(dir: &std::path::Path, replies: &[&str]) -> Worker {
        let mut config = PartialConfig {
            data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
        .finalize();
        config.voice.enabled = false;
        let router = Router::new(
            config.clone(),
            Services {
                chat: Some(Arc::new(ScriptedChatModel::replying(replies))),
                ..Default::default()
            },
        );
        let transcript = TranscriptLogger::new(&config.logs_dir()).ok();
        Worker::new(
            router,
            Arc::new(Speaker::new(&config.voice)),
            Listener::new(&config.voice, None).unwrap(),
            transcript,
            true,
        )
    }

    fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    #[tokio::test]
    async fn chat_line_produces_a_reply() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = worker(dir.path(), &["Hi there"]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        assert!(w.process("hello", &tx).await);
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Reply { text, agent: AgentKind::General, .. } if text == "Hi there"
        )));
        assert!(matches!(events.last(), Some(Event::Idle)));
    }

    #[tokio::test]
    async fn agent_command_switches_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = worker(dir.path(), &[]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        w.process("/agent calculator", &tx).await;
        assert_eq!(w.router().active(), AgentKind::Calculator);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [Event::AgentChanged {
                agent: AgentKind::Calculator,
                ..
            }]
        ));

        w.process("/agent nonsense", &tx).await;
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [Event::Notice(m)] if m.contains("Unknown agent")
        ));
    }

    #[tokio::test]
    async fn upload_switches_agent_and_needs_an_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "plain text").unwrap();
        let mut w = worker(dir.path(), &[]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        w.process(&format!("/upload {}", notes.display()), &tx).await;
        let events = drain(&mut rx);
        assert_eq!(w.router().active(), AgentKind::Document);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::Notice(m) if m.starts_with("No API key")))
        );
    }

    #[tokio::test]
    async fn quit_stops_processing() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = worker(dir.path(), &[]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(!w.process("/quit", &tx).await);
        assert!(matches!(drain(&mut rx).as_slice(), [Event::Quit]));
    }

    #[tokio::test]
    async fn listen_without_key_reports_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = worker(dir.path(), &[]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        w.process("/listen", &tx).await;
        let events = drain(&mut rx);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::Error(m) if m.contains("OPENAI_API_KEY")))
        );
    }
}
