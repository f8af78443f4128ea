//! Spoken replies through an OS text-to-speech command.
//!
//! One utterance at a time. The running TTS child's pid is kept so
//! [`Speaker::stop`] can end it from another task. If the command fails,
//! output is marked unavailable for the rest of the session.

use std::process::Stdio;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::process::Command;

use super::speech_text::prepare_speech;
use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::exec::terminate_process;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Spoken,
    /// Stopped by [`Speaker::stop`] before it finished.
    Stopped,
    Disabled,
    /// A previous failure turned output off.
    Unavailable,
    AlreadySpeaking,
}

pub struct Speaker {
    command: Vec<String>,
    char_limit: usize,
    enabled: AtomicBool,
    working: AtomicBool,
    current: Mutex<Option<u32>>,
}

impl Speaker {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            command: config.tts_command.clone(),
            char_limit: config.speech_char_limit,
            enabled: AtomicBool::new(config.enabled),
            working: AtomicBool::new(!config.tts_command.is_empty()),
            current: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::SeqCst)
    }

    pub fn is_speaking(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    /// Speak `text` after stripping markdown and truncating it. Waits until
    /// the TTS command exits.
    pub async fn speak(&self, text: &str) -> Result<SpeechOutcome, VoiceError> {
        if !self.is_enabled() {
            return Ok(SpeechOutcome::Disabled);
        }
        if !self.is_working() {
            return Ok(SpeechOutcome::Unavailable);
        }
        let Some((program, args)) = self.command.split_first() else {
            return Ok(SpeechOutcome::Unavailable);
        };

        let speech = prepare_speech(text, self.char_limit);
        let mut args: Vec<String> = args.iter().map(|a| a.replace("{text}", &speech)).collect();
        if !self.command.iter().any(|a| a.contains("{text}")) {
            args.push(speech);
        }

        let mut child = {
            let mut current = self.current.lock().unwrap();
            if current.is_some() {
                return Ok(SpeechOutcome::AlreadySpeaking);
            }
            let child = Command::new(program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| self.fail(format!("failed to start `{program}`: {e}")))?;
            *current = child.id();
            child
        };
        tracing::debug!(program = %program, pid = ?child.id(), "Speaking");

        let status = child.wait().await;
        // stop() clears the slot before signalling, so an empty slot here
        // means this utterance was interrupted.
        let was_stopped = self.current.lock().unwrap().take().is_none();
        if was_stopped {
            return Ok(SpeechOutcome::Stopped);
        }

        match status {
            Ok(status) if status.success() => Ok(SpeechOutcome::Spoken),
            Ok(status) => Err(self.fail(format!("`{program}` exited with {status}"))),
            Err(e) => Err(self.fail(e.to_string())),
        }
    }

    /// Interrupt the current utterance. Returns whether one was running.
    pub fn stop(&self) -> bool {
        match self.current.lock().unwrap().take() {
            Some(pid) => {
                tracing::info!(pid, "Stopping speech");
                terminate_process(pid);
                true
            }
            None => false,
        }
    }

    fn fail(&self, message: String) -> VoiceError {
        tracing::warn!(error = %message, "TTS failed, disabling voice output");
        self.working.store(false, Ordering::SeqCst);
        VoiceError::Tts(message)
    }
}
