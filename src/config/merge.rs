use super::schema::{
    AppConfig, ModelConfig, PartialConfig, ProviderModels, RetrievalConfig, SearchConfig,
    VoiceConfig,
};
use crate::agents::AgentKind;
use std::path::PathBuf;

pub const GITHUB_MODELS_ENDPOINT: &str = "https://models.github.ai/inference";
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence. List values use REPLACE semantics.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            github_endpoint: self.github_endpoint.or(fallback.github_endpoint),
            github_chat_model: self.github_chat_model.or(fallback.github_chat_model),
            github_embedding_model: self
                .github_embedding_model
                .or(fallback.github_embedding_model),
            openai_endpoint: self.openai_endpoint.or(fallback.openai_endpoint),
            openai_chat_model: self.openai_chat_model.or(fallback.openai_chat_model),
            openai_embedding_model: self
                .openai_embedding_model
                .or(fallback.openai_embedding_model),
            temperature: self.temperature.or(fallback.temperature),
            data_dir: self.data_dir.or(fallback.data_dir),
            transcript_log: self.transcript_log.or(fallback.transcript_log),
            chunk_size: self.chunk_size.or(fallback.chunk_size),
            chunk_overlap: self.chunk_overlap.or(fallback.chunk_overlap),
            top_k: self.top_k.or(fallback.top_k),
            follow_up_top_k: self.follow_up_top_k.or(fallback.follow_up_top_k),
            min_similarity: self.min_similarity.or(fallback.min_similarity),
            repo_extensions: self.repo_extensions.or(fallback.repo_extensions),
            clone_timeout_secs: self.clone_timeout_secs.or(fallback.clone_timeout_secs),
            max_tool_iterations: self.max_tool_iterations.or(fallback.max_tool_iterations),
            default_agent: self.default_agent.or(fallback.default_agent),
            search_max_results: self.search_max_results.or(fallback.search_max_results),
            search_rate_limit_secs: self
                .search_rate_limit_secs
                .or(fallback.search_rate_limit_secs),
            search_provider: self.search_provider.or(fallback.search_provider),
            voice_enabled: self.voice_enabled.or(fallback.voice_enabled),
            tts_command: self.tts_command.or(fallback.tts_command),
            recorder_command: self.recorder_command.or(fallback.recorder_command),
            transcription_model: self.transcription_model.or(fallback.transcription_model),
            transcription_endpoint: self
                .transcription_endpoint
                .or(fallback.transcription_endpoint),
            speech_char_limit: self.speech_char_limit.or(fallback.speech_char_limit),
            record_timeout_secs: self.record_timeout_secs.or(fallback.record_timeout_secs),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        let chunk_size = self.chunk_size.unwrap_or(1000).max(1);
        // Overlap must stay below the chunk size or the splitter rejects the config.
        let chunk_overlap = self.chunk_overlap.unwrap_or(200).min(chunk_size - 1);

        AppConfig {
            model: ModelConfig {
                github: ProviderModels {
                    endpoint: self
                        .github_endpoint
                        .unwrap_or_else(|| GITHUB_MODELS_ENDPOINT.to_string()),
                    chat_model: self
                        .github_chat_model
                        .unwrap_or_else(|| "openai/gpt-4.1-mini".to_string()),
                    embedding_model: self
                        .github_embedding_model
                        .unwrap_or_else(|| "openai/text-embedding-3-small".to_string()),
                },
                openai: ProviderModels {
                    endpoint: self
                        .openai_endpoint
                        .unwrap_or_else(|| OPENAI_ENDPOINT.to_string()),
                    chat_model: self
                        .openai_chat_model
                        .unwrap_or_else(|| "gpt-4.1-mini".to_string()),
                    embedding_model: self
                        .openai_embedding_model
                        .unwrap_or_else(|| "text-embedding-3-small".to_string()),
                },
                temperature: self.temperature.unwrap_or(0.3),
            },
            data_dir: self.data_dir.unwrap_or_else(default_data_dir),
            transcript_log: self.transcript_log.unwrap_or(true),
            retrieval: RetrievalConfig {
                chunk_size,
                chunk_overlap,
                top_k: self.top_k.unwrap_or(3),
                follow_up_top_k: self.follow_up_top_k.unwrap_or(5),
                min_similarity: self.min_similarity.unwrap_or(0.0),
                repo_extensions: self.repo_extensions.unwrap_or_else(|| {
                    vec![".py".to_string(), ".ipynb".to_string(), ".md".to_string()]
                }),
                clone_timeout_secs: self.clone_timeout_secs.unwrap_or(300),
            },
            max_tool_iterations: self.max_tool_iterations.unwrap_or(20),
            default_agent: self.default_agent.unwrap_or(AgentKind::General),
            search: SearchConfig {
                max_results: self.search_max_results.unwrap_or(5),
                rate_limit_secs: self.search_rate_limit_secs.unwrap_or(1.0),
                provider: self
                    .search_provider
                    .unwrap_or_else(|| "duckduckgo".to_string()),
            },
            voice: VoiceConfig {
                enabled: self.voice_enabled.unwrap_or(true),
                tts_command: self.tts_command.unwrap_or_else(|| vec!["say".to_string()]),
                recorder_command: self.recorder_command.unwrap_or_else(default_recorder),
                transcription_model: self
                    .transcription_model
                    .unwrap_or_else(|| "whisper-1".to_string()),
                transcription_endpoint: self
                    .transcription_endpoint
                    .unwrap_or_else(|| format!("{OPENAI_ENDPOINT}/audio/transcriptions")),
                speech_char_limit: self.speech_char_limit.unwrap_or(500),
                record_timeout_secs: self.record_timeout_secs.unwrap_or(20),
            },
        }
    }
}

/// Platform data directory, or `./.ask-llama` when none can be determined.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "ask-llama")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".ask-llama"))
}

/// sox `rec`: 16 kHz mono wav, stop after 1.5 s of silence, 15 s phrase limit.
/// `{output}` is replaced with the recording path.
fn default_recorder() -> Vec<String> {
    [
        "rec", "-q", "-c", "1", "-r", "16000", "{output}", "silence", "1", "0.1", "1%", "1",
        "1.5", "1%", "trim", "0", "15",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
