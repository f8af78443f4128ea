//! genai-backed [`ChatModel`] for OpenAI-compatible endpoints.
//!
//! GitHub Models and OpenAI both speak the OpenAI chat protocol, so every
//! request is routed through the OpenAI adapter with the endpoint and key
//! taken from [`ModelAccess`] instead of genai's environment defaults.

use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatOptions, ChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};

use super::{ChatModel, ChatTurn};
use crate::config::ModelAccess;
use crate::error::AgentError;

pub struct GenaiChatModel {
    client: Client,
    model: String,
}

impl GenaiChatModel {
    pub fn new(access: &ModelAccess) -> Self {
        // genai joins paths onto the endpoint, which needs a trailing slash.
        let endpoint = format!("{}/", access.endpoint.trim_end_matches('/'));
        let api_key = access.api_key.clone();

        let resolver = ServiceTargetResolver::from_resolver_fn(
            move |service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                let ServiceTarget { model, .. } = service_target;
                Ok(ServiceTarget {
                    endpoint: Endpoint::from_owned(endpoint.clone()),
                    auth: AuthData::from_single(api_key.clone()),
                    model: ModelIden::new(AdapterKind::OpenAI, model.model_name),
                })
            },
        );

        let client = Client::builder()
            .with_service_target_resolver(resolver)
            .build();

        Self {
            client,
            model: access.chat_model.clone(),
        }
    }
}

#[async_trait]
impl ChatModel for GenaiChatModel {
    async fn complete(
        &self,
        request: ChatRequest,
        temperature: f64,
    ) -> Result<ChatTurn, AgentError> {
        let options = ChatOptions::default().with_temperature(temperature);

        let response = self
            .client
            .exec_chat(&self.model, request, Some(&options))
            .await
            .map_err(|e| AgentError::LlmError(e.to_string()))?;

        let text = response
            .content
            .first_text()
            .map(|t| t.to_string())
            .filter(|t| !t.trim().is_empty());
        let tool_calls = response
            .content
            .tool_calls()
            .into_iter()
            .cloned()
            .collect();

        Ok(ChatTurn { text, tool_calls })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
