//! Dispatches each user input to the active agent.
//!
//! The router is the handler boundary: every failure below it is turned
//! into a chat message here, so callers always get text back.

use std::path::PathBuf;
use std::sync::Arc;

use super::AgentKind;
use super::calculator::CalculatorTools;
use super::document::DocumentStore;
use super::modifier::{ModifierSession, RepoModifier};
use super::prompts;
use super::repo_reader::RepoReader;
use super::web::WebTools;
use crate::config::{AppConfig, Credentials, ModelAccess, credentials::NO_API_KEY_MESSAGE};
use crate::error::AgentError;
use crate::github::validator::{list_accessible_repositories, validate_setup};
use crate::github::{GitHubClient, HostingApi};
use crate::llm::{
    CHAT_TEMPERATURE, ChatModel, Embedder, GenaiChatModel, OpenAiEmbedder, TOOL_TEMPERATURE,
    ToolCallRecord, ToolSet, run_tool_loop,
};
use crate::session::Conversation;

pub const UPLOAD_FIRST: &str = "Please upload documents first before asking questions.";
pub const DOCUMENTS_ONLY: &str = "I can only answer questions about the uploaded documents. \
Please ask something related to the documents.";
pub const PROCESS_REPO_FIRST: &str =
    "Please provide a GitHub repository URL and process it first before asking questions.";
pub const REPOSITORY_ONLY: &str = "I can only answer questions about the provided GitHub \
repository. Please ask something related to the codebase.";
pub const INIT_MODIFIER_FIRST: &str = "Please initialize the GitHub Code Modifier Agent first \
by providing a repository URL with /modify <url>.";

const REPO_LIST_LIMIT: usize = 20;

/// External clients the agents need. `None` means the credential for that
/// service is missing; the affected agents answer with a message instead.
#[derive(Clone, Default)]
pub struct Services {
    pub chat: Option<Arc<dyn ChatModel>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub hosting: Option<Arc<dyn HostingApi>>,
    pub web_tools: Option<Arc<dyn ToolSet>>,
}

impl Services {
    /// Build the real clients from environment credentials.
    pub fn from_credentials(config: &AppConfig, credentials: &Credentials) -> Self {
        let mut services = Services::default();

        match ModelAccess::resolve(credentials, &config.model) {
            Ok(access) => {
                tracing::info!(
                    provider = access.provider.label(),
                    model = %access.chat_model,
                    "Model access resolved"
                );
                services.chat = Some(Arc::new(GenaiChatModel::new(&access)));
                match OpenAiEmbedder::new(&access) {
                    Ok(embedder) => services.embedder = Some(Arc::new(embedder)),
                    Err(e) => tracing::warn!(error = %e, "Embedding client unavailable"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "No model credentials"),
        }

        if let Some(token) = &credentials.github_api_token {
            match GitHubClient::new(token) {
                Ok(client) => services.hosting = Some(Arc::new(client)),
                Err(e) => tracing::warn!(error = %e, "GitHub client unavailable"),
            }
        }

        match WebTools::new(&config.search, credentials.brave_api_key.as_deref()) {
            Ok(tools) => services.web_tools = Some(Arc::new(tools)),
            Err(e) => tracing::warn!(error = %e, "Web tools unavailable"),
        }

        services
    }
}

/// A reply for the transcript plus the tools used to produce it.
#[derive(Debug, Clone, Default)]
pub struct RouterReply {
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl RouterReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }
}

pub struct Router {
    config: AppConfig,
    services: Services,
    active: AgentKind,
    conversation: Conversation,
    documents: DocumentStore,
    repos: RepoReader,
    modifier: Option<ModifierSession>,
    calculator: CalculatorTools,
}

impl Router {
    pub fn new(config: AppConfig, services: Services) -> Self {
        let active = config.default_agent;
        let mut router = Self {
            documents: DocumentStore::new(config.doc_store_dir()),
            repos: RepoReader::new(config.git_store_dir()),
            conversation: Conversation::new(active.system_prompt()),
            config,
            services,
            active,
            modifier: None,
            calculator: CalculatorTools,
        };
        if active == AgentKind::Document {
            router.load_persisted_documents();
        }
        router
    }

    pub fn active(&self) -> AgentKind {
        self.active
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.services
            .chat
            .as_ref()
            .map(|c| c.model_name())
            .unwrap_or("none")
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn repos(&self) -> &RepoReader {
        &self.repos
    }

    pub fn modifier(&self) -> Option<&ModifierSession> {
        self.modifier.as_ref()
    }

    /// Switch agents. Changing agent starts a new conversation.
    pub fn select_agent(&mut self, kind: AgentKind) {
        if kind == self.active {
            return;
        }
        tracing::info!(from = %self.active, to = %kind, "Agent selected");
        self.active = kind;
        self.reset_conversation();
        if kind == AgentKind::Document {
            self.load_persisted_documents();
        }
    }

    pub fn new_chat(&mut self) {
        self.reset_conversation();
    }

    fn reset_conversation(&mut self) {
        self.conversation.reset(self.active.system_prompt());
        self.documents.clear_context();
        if let Some(session) = self.modifier.as_mut() {
            session.clear_pending();
        }
    }

    fn load_persisted_documents(&mut self) {
        if let Err(e) = self.documents.load_persisted() {
            tracing::warn!(error = %e, "Could not load persisted document index");
        }
    }

    /// One line describing what the active agent is working with.
    pub fn resource_status(&self) -> Option<String> {
        match self.active {
            AgentKind::Document => Some(match self.documents.index() {
                Some(idx) => format!(
                    "📄 {} document(s), {} chunks indexed",
                    idx.source_count(),
                    idx.len()
                ),
                None => "No documents uploaded (/upload <file.pdf>)".to_string(),
            }),
            AgentKind::RepoQa => Some(match self.repos.current() {
                Some(repo) => format!(
                    "📂 {} ({} files, {} chunks)",
                    repo.name,
                    repo.file_count(),
                    repo.chunk_count()
                ),
                None => "No repository processed (/repo <url>)".to_string(),
            }),
            AgentKind::RepoModifier => Some(match &self.modifier {
                Some(session) => format!(
                    "⚡ {} @ {}{}",
                    session.repo(),
                    session.info().default_branch,
                    if session.pending().is_some() {
                        " (awaiting confirmation)"
                    } else {
                        ""
                    }
                ),
                None => "Not initialized (/modify <url>)".to_string(),
            }),
            _ => None,
        }
    }

    /// Answer one user input with the active agent and record the exchange.
    pub async fn handle(&mut self, input: &str) -> RouterReply {
        let input = input.trim();
        if input.is_empty() {
            return RouterReply::text(AgentError::EmptyInput.to_string());
        }

        let previous = self.conversation.last_assistant().map(str::to_string);
        let reply = match self.services.chat.clone() {
            None => RouterReply::text(NO_API_KEY_MESSAGE),
            Some(chat) => match self.active {
                AgentKind::General => self.general(chat.as_ref(), input).await,
                AgentKind::Document => {
                    self.document(chat.as_ref(), input, previous.is_some())
                        .await
                }
                AgentKind::RepoQa => {
                    self.repo_qa(chat.as_ref(), input, previous.as_deref())
                        .await
                }
                AgentKind::RepoModifier => {
                    self.repo_modifier(chat.as_ref(), input, previous.as_deref())
                        .await
                }
                AgentKind::WebSearch => {
                    self.web_search(chat.as_ref(), input, previous.as_deref())
                        .await
                }
                AgentKind::Calculator => {
                    self.calculator(chat.as_ref(), input, previous.as_deref())
                        .await
                }
            },
        };

        tracing::info!(
            agent = %self.active,
            tool_calls = reply.tool_calls.len(),
            "Handled input"
        );
        self.conversation.push_user(input);
        self.conversation.push_assistant(reply.text.clone());
        reply
    }

    async fn complete(&self, chat: &dyn ChatModel, model_input: &str) -> RouterReply {
        let request = self.conversation.request_with(model_input);
        let result = chat
            .complete(request, CHAT_TEMPERATURE)
            .await
            .and_then(|turn| turn.text.ok_or(AgentError::EmptyResponse));
        match result {
            Ok(text) => RouterReply::text(text),
            Err(e) => chat_error(e),
        }
    }

    async fn general(&self, chat: &dyn ChatModel, input: &str) -> RouterReply {
        self.complete(chat, input).await
    }

    async fn document(
        &mut self,
        chat: &dyn ChatModel,
        input: &str,
        follow_up: bool,
    ) -> RouterReply {
        let Some(embedder) = self.services.embedder.clone() else {
            return RouterReply::text(NO_API_KEY_MESSAGE);
        };
        if !self.documents.is_loaded() {
            self.load_persisted_documents();
            if !self.documents.is_loaded() {
                return RouterReply::text(UPLOAD_FIRST);
            }
        }

        let context = self
            .documents
            .retrieve(input, follow_up, embedder.as_ref(), &self.config.retrieval)
            .await;
        let prompt = match context {
            Err(e) => return chat_error(e),
            Ok(None) => return RouterReply::text(DOCUMENTS_ONLY),
            Ok(Some(context)) if follow_up => prompts::document_follow_up(&context, input),
            Ok(Some(context)) => prompts::document_question(&context, input),
        };
        self.complete(chat, &prompt).await
    }

    async fn repo_qa(
        &self,
        chat: &dyn ChatModel,
        input: &str,
        previous: Option<&str>,
    ) -> RouterReply {
        let Some(embedder) = self.services.embedder.clone() else {
            return RouterReply::text(NO_API_KEY_MESSAGE);
        };
        if self.repos.current().is_none() {
            return RouterReply::text(PROCESS_REPO_FIRST);
        }

        let context = self
            .repos
            .retrieve(input, embedder.as_ref(), &self.config.retrieval)
            .await;
        let prompt = match (context, previous) {
            (Err(e), _) => return chat_error(e),
            (Ok(None), _) => return RouterReply::text(REPOSITORY_ONLY),
            (Ok(Some(context)), Some(last)) => prompts::repo_follow_up(&context, last, input),
            (Ok(Some(context)), None) => prompts::repo_question(&context, input),
        };
        self.complete(chat, &prompt).await
    }

    async fn repo_modifier(
        &mut self,
        chat: &dyn ChatModel,
        input: &str,
        previous: Option<&str>,
    ) -> RouterReply {
        let max_iterations = self.config.max_tool_iterations;
        let Some(session) = self.modifier.as_mut() else {
            return RouterReply::text(INIT_MODIFIER_FIRST);
        };
        match session.handle(chat, input, previous, max_iterations).await {
            Ok(outcome) => RouterReply {
                text: outcome.answer,
                tool_calls: outcome.tool_calls,
            },
            Err(e) => tool_agent_error(AgentKind::RepoModifier, e),
        }
    }

    async fn web_search(
        &self,
        chat: &dyn ChatModel,
        input: &str,
        previous: Option<&str>,
    ) -> RouterReply {
        let Some(tools) = self.services.web_tools.clone() else {
            return tool_agent_error(
                AgentKind::WebSearch,
                AgentError::LlmError("web client unavailable".into()),
            );
        };
        let prompt = match previous {
            Some(last) => prompts::web_follow_up(last, input),
            None => input.to_string(),
        };
        self.run_tools(chat, tools.as_ref(), AgentKind::WebSearch, &prompt)
            .await
    }

    async fn calculator(
        &self,
        chat: &dyn ChatModel,
        input: &str,
        previous: Option<&str>,
    ) -> RouterReply {
        let prompt = match previous {
            Some(last) => prompts::calculator_follow_up(last, input),
            None => input.to_string(),
        };
        self.run_tools(chat, &self.calculator, AgentKind::Calculator, &prompt)
            .await
    }

    async fn run_tools(
        &self,
        chat: &dyn ChatModel,
        tools: &dyn ToolSet,
        kind: AgentKind,
        prompt: &str,
    ) -> RouterReply {
        let outcome = run_tool_loop(
            chat,
            tools,
            kind.system_prompt(),
            prompt,
            TOOL_TEMPERATURE,
            self.config.max_tool_iterations,
        )
        .await;
        match outcome {
            Ok(outcome) => RouterReply {
                text: outcome.answer,
                tool_calls: outcome.tool_calls,
            },
            Err(e) => tool_agent_error(kind, e),
        }
    }

    /// Index PDFs for the Document agent.
    pub async fn upload_documents(&mut self, paths: &[PathBuf]) -> String {
        let Some(embedder) = self.services.embedder.clone() else {
            return NO_API_KEY_MESSAGE.to_string();
        };
        match self
            .documents
            .upload(paths, embedder.as_ref(), &self.config.retrieval)
            .await
        {
            Ok(summary) => summary.message(),
            Err(e) => {
                tracing::warn!(error = %e, "Document upload failed");
                format!("❌ {e}")
            }
        }
    }

    /// Clone and index a repository for the Repo agent.
    pub async fn process_repository(&mut self, url: &str) -> String {
        let Some(embedder) = self.services.embedder.clone() else {
            return NO_API_KEY_MESSAGE.to_string();
        };
        match self
            .repos
            .process(url, embedder.as_ref(), &self.config.retrieval)
            .await
        {
            Ok(summary) => summary.message(),
            Err(e) => {
                tracing::warn!(error = %e, url, "Repository processing failed");
                format!("❌ Error processing repository: {e}")
            }
        }
    }

    /// Validate access to `url` and connect the modifier to it.
    pub async fn init_modifier(&mut self, url: &str) -> String {
        let Some(api) = self.services.hosting.clone() else {
            return validate_setup(None, Some(url)).await.render();
        };

        let report = validate_setup(Some(api.as_ref()), Some(url)).await;
        if !report.ready() {
            return report.render();
        }

        match RepoModifier::connect(api, url).await {
            Ok(modifier) => {
                let message = format!(
                    "{}✅ Code Modifier Agent initialized for {} (default branch: {})",
                    report.render(),
                    modifier.repo(),
                    modifier.info().default_branch
                );
                self.modifier = Some(ModifierSession::new(modifier));
                message
            }
            Err(e) => format!("❌ Failed to initialize Code Modifier Agent: {e}"),
        }
    }

    pub fn reset_modifier(&mut self) -> String {
        self.modifier = None;
        "🔄 Code Modifier Agent reset.".to_string()
    }

    /// Check the hosting token and, optionally, access to one repository.
    pub async fn validate(&self, url: Option<&str>) -> String {
        validate_setup(self.services.hosting.as_deref(), url)
            .await
            .render()
    }

    pub async fn list_repositories(&self) -> String {
        let Some(api) = self.services.hosting.as_deref() else {
            return "❌ GITHUB_API_TOKEN not found in environment variables".to_string();
        };
        let repos = list_accessible_repositories(api, REPO_LIST_LIMIT).await;
        if repos.is_empty() {
            return "No accessible repositories found.".to_string();
        }
        let lines: Vec<String> = repos
            .iter()
            .map(|r| {
                format!(
                    "• {}{}",
                    r.full_name,
                    if r.private { " (private)" } else { "" }
                )
            })
            .collect();
        format!("Accessible repositories:\n{}", lines.join("\n"))
    }
}

fn chat_error(e: impl std::fmt::Display) -> RouterReply {
    tracing::warn!(error = %e, "Agent request failed");
    RouterReply::text(format!("Sorry, I encountered an error: {e}"))
}

fn tool_agent_error(kind: AgentKind, e: AgentError) -> RouterReply {
    tracing::warn!(agent = %kind, error = %e, "Tool agent failed");
    let mut text = format!("❌ Error using {}: {e}", kind.label());
    if kind == AgentKind::RepoModifier {
        let message = e.to_string();
        if message.contains("404") || message.contains("Not Found") {
            text.push_str(
                "\n\n💡 Tip: Check that the repository and path exist and that your token can access them.",
            );
        } else if message.contains("401") || message.to_lowercase().contains("authentication") {
            text.push_str(
                "\n\n💡 Tip: Check that GITHUB_API_TOKEN is valid and has the 'repo' scope.",
            );
        }
    }
    RouterReply::text(text)
}
