//! Voice questions: record with an OS command, transcribe over HTTP.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::VoiceConfig;
use crate::error::VoiceError;
use crate::exec::run_command;

/// Anything shorter is a bare WAV header with no audio.
const MIN_RECORDING_BYTES: u64 = 1024;

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct Listener {
    http: reqwest::Client,
    recorder: Vec<String>,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl Listener {
    /// `api_key` is the `OPENAI_API_KEY`; without it [`Listener::listen`]
    /// fails with [`VoiceError::MissingCredential`].
    pub fn new(config: &VoiceConfig, api_key: Option<String>) -> Result<Self, VoiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        Ok(Self {
            http,
            recorder: config.recorder_command.clone(),
            endpoint: config.transcription_endpoint.clone(),
            model: config.transcription_model.clone(),
            api_key,
            timeout_secs: config.record_timeout_secs,
        })
    }

    /// Record one phrase and return its transcript.
    pub async fn listen(&self) -> Result<String, VoiceError> {
        let Some(api_key) = &self.api_key else {
            return Err(VoiceError::MissingCredential);
        };

        let path = std::env::temp_dir().join(format!("ask-llama-{}.wav", uuid::Uuid::new_v4()));
        let result = match self.record(&path).await {
            Ok(audio) => self.transcribe(audio, api_key).await,
            Err(e) => Err(e),
        };
        if path.exists()
            && let Err(e) = tokio::fs::remove_file(&path).await
        {
            tracing::debug!(path = %path.display(), error = %e, "Failed to remove recording");
        }
        result
    }

    async fn record(&self, path: &Path) -> Result<Vec<u8>, VoiceError> {
        let args = recorder_args(&self.recorder, path);
        let Some((program, args)) = args.split_first() else {
            return Err(VoiceError::Recorder("no recorder command configured".into()));
        };

        tracing::info!(program = %program, "Recording voice input");
        let result = run_command(program, args, None, self.timeout_secs)
            .await
            .map_err(|e| VoiceError::Recorder(e.to_string()))?;
        if result.timed_out {
            return Err(VoiceError::NoSpeech);
        }
        if !result.success() {
            let stderr = result.stderr.trim();
            return Err(VoiceError::Recorder(if stderr.is_empty() {
                format!("`{program}` exited with {:?}", result.exit_code)
            } else {
                stderr.to_string()
            }));
        }

        let audio = tokio::fs::read(path).await.map_err(|_| VoiceError::NoSpeech)?;
        if (audio.len() as u64) < MIN_RECORDING_BYTES {
            return Err(VoiceError::NoSpeech);
        }
        Ok(audio)
    }

    async fn transcribe(&self, audio: Vec<u8>, api_key: &str) -> Result<String, VoiceError> {
        let part = Part::bytes(audio)
            .file_name("speech.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        if !status.is_success() {
            return Err(VoiceError::Transcription(format!("{status}: {body}")));
        }
        parse_transcription(&body)
    }
}

/// Substitute `{output}` in the recorder command, or append the path when
/// no placeholder is present.
pub fn recorder_args(command: &[String], output: &Path) -> Vec<String> {
    let out = output.display().to_string();
    let mut args: Vec<String> = command.iter().map(|a| a.replace("{output}", &out)).collect();
    if !command.iter().any(|a| a.contains("{output}")) && !args.is_empty() {
        args.push(out);
    }
    args
}

pub fn parse_transcription(body: &str) -> Result<String, VoiceError> {
    let parsed: TranscriptionResponse = serde_json::from_str(body)
        .map_err(|e| VoiceError::Transcription(format!("unexpected response: {e}")))?;
    let text = parsed.text.trim();
    if text.is_empty() {
        Err(VoiceError::NotUnderstood)
    } else {
        Ok(text.to_string())
    }
}
