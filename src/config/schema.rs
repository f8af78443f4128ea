use serde::Deserialize;
use std::path::PathBuf;

use crate::agents::AgentKind;

/// The TOML file structure for ask-llama.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub model: Option<ModelSection>,
    pub storage: Option<StorageSection>,
    pub retrieval: Option<RetrievalSection>,
    pub agents: Option<AgentsSection>,
    pub search: Option<SearchSection>,
    pub voice: Option<VoiceSection>,
}

#[derive(Debug, Deserialize)]
pub struct ModelSection {
    pub github_endpoint: Option<String>,
    pub github_chat_model: Option<String>,
    pub github_embedding_model: Option<String>,
    pub openai_endpoint: Option<String>,
    pub openai_chat_model: Option<String>,
    pub openai_embedding_model: Option<String>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StorageSection {
    pub data_dir: Option<String>,
    pub transcript_log: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RetrievalSection {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub top_k: Option<usize>,
    pub follow_up_top_k: Option<usize>,
    pub min_similarity: Option<f32>,
    pub repo_extensions: Option<Vec<String>>,
    pub clone_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AgentsSection {
    pub max_tool_iterations: Option<usize>,
    pub default_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchSection {
    pub max_results: Option<usize>,
    pub rate_limit_secs: Option<f64>,
    /// `"duckduckgo"` or `"brave"`; brave needs `BRAVE_API_KEY`.
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoiceSection {
    pub enabled: Option<bool>,
    pub tts_command: Option<Vec<String>>,
    pub recorder_command: Option<Vec<String>>,
    pub transcription_model: Option<String>,
    pub transcription_endpoint: Option<String>,
    pub speech_char_limit: Option<usize>,
    pub record_timeout_secs: Option<u64>,
}

/// Endpoint and model names for one model provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderModels {
    pub endpoint: String,
    pub chat_model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub github: ProviderModels,
    pub openai: ProviderModels,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub follow_up_top_k: usize,
    pub min_similarity: f32,
    pub repo_extensions: Vec<String>,
    pub clone_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_results: usize,
    pub rate_limit_secs: f64,
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub enabled: bool,
    pub tts_command: Vec<String>,
    pub recorder_command: Vec<String>,
    pub transcription_model: String,
    pub transcription_endpoint: String,
    pub speech_char_limit: usize,
    pub record_timeout_secs: u64,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub data_dir: PathBuf,
    pub transcript_log: bool,
    pub retrieval: RetrievalConfig,
    pub max_tool_iterations: usize,
    pub default_agent: AgentKind,
    pub search: SearchConfig,
    pub voice: VoiceConfig,
}

impl AppConfig {
    pub fn doc_store_dir(&self) -> PathBuf {
        self.data_dir.join("doc_store")
    }

    pub fn git_store_dir(&self) -> PathBuf {
        self.data_dir.join("git_store")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub github_endpoint: Option<String>,
    pub github_chat_model: Option<String>,
    pub github_embedding_model: Option<String>,
    pub openai_endpoint: Option<String>,
    pub openai_chat_model: Option<String>,
    pub openai_embedding_model: Option<String>,
    pub temperature: Option<f64>,
    pub data_dir: Option<PathBuf>,
    pub transcript_log: Option<bool>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub top_k: Option<usize>,
    pub follow_up_top_k: Option<usize>,
    pub min_similarity: Option<f32>,
    pub repo_extensions: Option<Vec<String>>,
    pub clone_timeout_secs: Option<u64>,
    pub max_tool_iterations: Option<usize>,
    pub default_agent: Option<AgentKind>,
    pub search_max_results: Option<usize>,
    pub search_rate_limit_secs: Option<f64>,
    pub search_provider: Option<String>,
    pub voice_enabled: Option<bool>,
    pub tts_command: Option<Vec<String>>,
    pub recorder_command: Option<Vec<String>>,
    pub transcription_model: Option<String>,
    pub transcription_endpoint: Option<String>,
    pub speech_char_limit: Option<usize>,
    pub record_timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Flatten the sectioned file into a mergeable partial.
    pub fn to_partial(self) -> PartialConfig {
        let model = self.model;
        let storage = self.storage;
        let retrieval = self.retrieval;
        let agents = self.agents;
        let search = self.search;
        let voice = self.voice;

        let default_agent = agents
            .as_ref()
            .and_then(|a| a.default_agent.as_deref())
            .and_then(|name| match AgentKind::parse(name) {
                Some(kind) => Some(kind),
                None => {
                    tracing::warn!(agent = name, "Unknown default_agent in config, ignoring");
                    None
                }
            });

        PartialConfig {
            github_endpoint: model.as_ref().and_then(|m| m.github_endpoint.clone()),
            github_chat_model: model.as_ref().and_then(|m| m.github_chat_model.clone()),
            github_embedding_model: model.as_ref().and_then(|m| m.github_embedding_model.clone()),
            openai_endpoint: model.as_ref().and_then(|m| m.openai_endpoint.clone()),
            openai_chat_model: model.as_ref().and_then(|m| m.openai_chat_model.clone()),
            openai_embedding_model: model.as_ref().and_then(|m| m.openai_embedding_model.clone()),
            temperature: model.as_ref().and_then(|m| m.temperature),
            data_dir: storage
                .as_ref()
                .and_then(|s| s.data_dir.as_ref())
                .map(PathBuf::from),
            transcript_log: storage.as_ref().and_then(|s| s.transcript_log),
            chunk_size: retrieval.as_ref().and_then(|r| r.chunk_size),
            chunk_overlap: retrieval.as_ref().and_then(|r| r.chunk_overlap),
            top_k: retrieval.as_ref().and_then(|r| r.top_k),
            follow_up_top_k: retrieval.as_ref().and_then(|r| r.follow_up_top_k),
            min_similarity: retrieval.as_ref().and_then(|r| r.min_similarity),
            repo_extensions: retrieval.as_ref().and_then(|r| r.repo_extensions.clone()),
            clone_timeout_secs: retrieval.as_ref().and_then(|r| r.clone_timeout_secs),
            max_tool_iterations: agents.as_ref().and_then(|a| a.max_tool_iterations),
            default_agent,
            search_max_results: search.as_ref().and_then(|s| s.max_results),
            search_rate_limit_secs: search.as_ref().and_then(|s| s.rate_limit_secs),
            search_provider: search.as_ref().and_then(|s| s.provider.clone()),
            voice_enabled: voice.as_ref().and_then(|v| v.enabled),
            tts_command: voice.as_ref().and_then(|v| v.tts_command.clone()),
            recorder_command: voice.as_ref().and_then(|v| v.recorder_command.clone()),
            transcription_model: voice.as_ref().and_then(|v| v.transcription_model.clone()),
            transcription_endpoint: voice.as_ref().and_then(|v| v.transcription_endpoint.clone()),
            speech_char_limit: voice.as_ref().and_then(|v| v.speech_char_limit),
            record_timeout_secs: voice.as_ref().and_then(|v| v.record_timeout_secs),
        }
    }
}
