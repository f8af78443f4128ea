pub mod credentials;
pub mod merge;
pub mod schema;

pub use credentials::{Credentials, ModelAccess, Provider};
pub use schema::*;

use crate::agents::AgentKind;
use crate::cli::{Cli, Commands};
use anyhow::Context;
use std::path::Path;

/// Load configuration by merging global, local, and CLI sources.
/// Precedence: CLI > local config > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply).
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    // Layer 1: Global config (~/.config/ask-llama/ask-llama.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Local config (--config, or ./ask-llama.toml)
    let local = match &cli.config {
        Some(path) => load_toml_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => load_toml_file(Path::new("ask-llama.toml")).unwrap_or_default(),
    };

    // Layer 3: CLI args (converted to PartialConfig)
    let cli_partial = cli_to_partial(cli);

    let config = cli_partial
        .with_fallback(local)
        .with_fallback(global)
        .finalize();

    Ok(config)
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load and parse a TOML config file into a PartialConfig.
///
/// A missing file is `Ok(default)`. Parse errors are logged and the layer is
/// ignored; only an unreadable file is an error.
fn load_toml_file(path: &Path) -> Result<PartialConfig, crate::error::ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents, path) {
            Ok(partial) => {
                tracing::info!("Loaded config from {}", path.display());
                Ok(partial)
            }
            Err(e) => {
                tracing::warn!("Config parse error: {}", e);
                Ok(PartialConfig::default())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(PartialConfig::default())
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            Err(e.into())
        }
    }
}

/// Parse TOML text into a PartialConfig.
pub fn parse_config(
    contents: &str,
    path: &Path,
) -> Result<PartialConfig, crate::error::ConfigError> {
    toml::from_str::<ConfigFile>(contents)
        .map(ConfigFile::to_partial)
        .map_err(|e| crate::error::ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/ask-llama/ask-llama.toml
/// macOS: ~/Library/Application Support/ask-llama/ask-llama.toml
fn global_config_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "", "ask-llama")
        .map(|dirs| dirs.config_dir().join("ask-llama.toml"))
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    let mut partial = PartialConfig {
        data_dir: cli.data_dir.clone(),
        ..Default::default()
    };

    if let Commands::Chat {
        agent,
        model,
        no_voice,
        ..
    } = &cli.command
    {
        // A model override applies to whichever provider ends up selected.
        partial.github_chat_model = model.clone();
        partial.openai_chat_model = model.clone();
        partial.default_agent = agent.as_deref().and_then(AgentKind::parse);
        if *no_voice {
            partial.voice_enabled = Some(false);
        }
    }

    partial
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_full_config_file() {
        let toml = r#"
            [model]
            github_chat_model = "openai/gpt-4o"
            temperature = 0.5

            [storage]
            data_dir = "/var/lib/llama"
            transcript_log = false

            [retrieval]
            top_k = 4
            repo_extensions = [".rs", ".md"]

            [agents]
            max_tool_iterations = 8
            default_agent = "calculator"

            [search]
            provider = "brave"

            [voice]
            enabled = false
            tts_command = ["espeak"]
        "#;
        let config = parse_config(toml, Path::new("test.toml"))
            .unwrap()
            .finalize();
        assert_eq!(config.model.github.chat_model, "openai/gpt-4o");
        assert!((config.model.temperature - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.data_dir, std::path::PathBuf::from("/var/lib/llama"));
        assert!(!config.transcript_log);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.retrieval.repo_extensions, vec![".rs", ".md"]);
        assert_eq!(config.max_tool_iterations, 8);
        assert_eq!(config.default_agent, AgentKind::Calculator);
        assert_eq!(config.search.provider, "brave");
        assert!(!config.voice.enabled);
        assert_eq!(config.voice.tts_command, vec!["espeak"]);
    }

    #[test]
    fn parse_error_carries_path() {
        let err = parse_config("[model\n", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn unknown_default_agent_is_ignored() {
        let partial = parse_config(
            "[agents]\ndefault_agent = \"astrologer\"\n",
            Path::new("x.toml"),
        )
        .unwrap();
        assert!(partial.default_agent.is_none());
    }

    #[test]
    fn cli_flags_override_file_values() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cfg.toml");
        std::fs::write(
            &path,
            "[storage]\ndata_dir = \"/from/file\"\n[voice]\nenabled = true\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "ask-llama",
            "--config",
            path.to_str().unwrap(),
            "--data-dir",
            "/from/cli",
            "chat",
            "--no-voice",
            "--agent",
            "search",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.data_dir, std::path::PathBuf::from("/from/cli"));
        assert!(!config.voice.enabled);
        assert_eq!(config.default_agent, AgentKind::WebSearch);
    }
}
