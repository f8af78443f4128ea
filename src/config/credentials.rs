//! Environment credentials and model-provider selection.
//!
//! Credentials never come from config files. `GITHUB_TOKEN` selects GitHub
//! Models; `OPENAI_API_KEY` is the fallback provider and also unlocks speech
//! transcription. `GITHUB_API_TOKEN` is a separate token for the repository
//! REST API.

use super::schema::{ModelConfig, ProviderModels};
use crate::error::ConfigError;

pub const NO_API_KEY_MESSAGE: &str =
    "No API key found. Please set either GITHUB_TOKEN or OPENAI_API_KEY in your environment variables.";

/// Secrets read from the process environment (and `.env`).
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub github_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub github_api_token: Option<String>,
    pub brave_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            github_token: non_empty_var("GITHUB_TOKEN"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            github_api_token: non_empty_var("GITHUB_API_TOKEN"),
            brave_api_key: non_empty_var("BRAVE_API_KEY"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    GitHubModels,
    OpenAi,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::GitHubModels => "GitHub Models",
            Provider::OpenAi => "OpenAI",
        }
    }
}

/// Everything needed to reach one OpenAI-compatible model endpoint.
#[derive(Debug, Clone)]
pub struct ModelAccess {
    pub provider: Provider,
    pub endpoint: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl ModelAccess {
    /// Pick GitHub Models when `GITHUB_TOKEN` is set, otherwise OpenAI.
    pub fn resolve(credentials: &Credentials, models: &ModelConfig) -> Result<Self, ConfigError> {
        if let Some(token) = &credentials.github_token {
            return Ok(Self::from_provider(
                Provider::GitHubModels,
                &models.github,
                token,
            ));
        }
        if let Some(key) = &credentials.openai_api_key {
            return Ok(Self::from_provider(Provider::OpenAi, &models.openai, key));
        }
        Err(ConfigError::MissingCredential(NO_API_KEY_MESSAGE.to_string()))
    }

    fn from_provider(provider: Provider, models: &ProviderModels, key: &str) -> Self {
        Self {
            provider,
            endpoint: models.endpoint.trim_end_matches('/').to_string(),
            api_key: key.to_string(),
            chat_model: models.chat_model.clone(),
            embedding_model: models.embedding_model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartialConfig;

    fn models() -> ModelConfig {
        PartialConfig::default().finalize().model
    }

    #[test]
    fn github_token_takes_precedence() {
        let creds = Credentials {
            github_token: Some("gh".into()),
            openai_api_key: Some("sk".into()),
            ..Default::default()
        };
        let access = ModelAccess::resolve(&creds, &models()).unwrap();
        assert_eq!(access.provider, Provider::GitHubModels);
        assert_eq!(access.endpoint, "https://models.github.ai/inference");
        assert_eq!(access.api_key, "gh");
        assert_eq!(access.embedding_model, "openai/text-embedding-3-small");
    }

    #[test]
    fn openai_is_the_fallback() {
        let creds = Credentials {
            openai_api_key: Some("sk".into()),
            ..Default::default()
        };
        let access = ModelAccess::resolve(&creds, &models()).unwrap();
        assert_eq!(access.provider, Provider::OpenAi);
        assert_eq!(access.chat_model, "gpt-4.1-mini");
    }

    #[test]
    fn no_credentials_is_a_user_facing_error() {
        let err = ModelAccess::resolve(&Credentials::default(), &models()).unwrap_err();
        assert!(err.to_string().starts_with("No API key found"));
    }
}
