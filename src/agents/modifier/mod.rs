//! Repository modifier agent.
//!
//! [`ops::RepoModifier`] performs the repository operations,
//! [`tools::ModifierTools`] exposes them to the model, and
//! [`ModifierSession`] runs the tool loop with a confirmation step: when a
//! reply asks for confirmation, the user's command is kept as a
//! [`PendingAction`] and replayed once the user agrees.

pub mod ops;
pub mod tools;

use std::collections::VecDeque;
use std::sync::Arc;

use super::prompts;
use crate::error::AgentError;
use crate::github::{RepoId, RepoInfo};
use crate::llm::{ChatModel, TOOL_TEMPERATURE, ToolLoopOutcome, run_tool_loop};

pub use ops::{RepoModifier, clean_path, normalize_file_path};
pub use tools::ModifierTools;

/// Phrases in a reply that mean the model is waiting for a go-ahead.
pub const CONFIRMATION_PHRASES: [&str; 5] =
    ["will proceed", "going to", "about to", "confirm", "proceed"];

/// User replies that approve a pending action.
pub const APPROVALS: [&str; 6] = ["yes", "confirm", "proceed", "ok", "sure", "do it"];

pub const CANCELLED_MESSAGE: &str = "Action cancelled. Please specify what you'd like me to do.";
pub const NOTHING_PENDING_MESSAGE: &str =
    "I don't have a pending action to execute. Please specify what you'd like me to do.";

const RECENT_REQUESTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub command: String,
}

pub fn needs_confirmation(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    CONFIRMATION_PHRASES.iter().any(|p| lower.contains(p))
}

pub fn is_approval(input: &str) -> bool {
    let normalized = input
        .trim()
        .trim_end_matches(['.', '!'])
        .trim()
        .to_lowercase();
    APPROVALS.contains(&normalized.as_str())
}

pub struct ModifierSession {
    modifier: Arc<RepoModifier>,
    tools: ModifierTools,
    pending: Option<PendingAction>,
    recent: VecDeque<String>,
}

impl ModifierSession {
    pub fn new(modifier: RepoModifier) -> Self {
        let modifier = Arc::new(modifier);
        Self {
            tools: ModifierTools::new(modifier.clone()),
            modifier,
            pending: None,
            recent: VecDeque::with_capacity(RECENT_REQUESTS),
        }
    }

    pub fn repo(&self) -> &RepoId {
        self.modifier.repo()
    }

    pub fn info(&self) -> &RepoInfo {
        self.modifier.info()
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Drop any action waiting for approval. Called when the conversation
    /// that asked for it goes away.
    pub fn clear_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::info!(command = %pending.command, "Pending modifier action discarded");
        }
    }

    fn remember(&mut self, input: &str) {
        if self.recent.len() == RECENT_REQUESTS {
            self.recent.pop_front();
        }
        self.recent.push_back(input.to_string());
    }

    /// Handle one user input. `last_answer` is the previous assistant reply
    /// in the conversation, if any.
    pub async fn handle(
        &mut self,
        model: &dyn ChatModel,
        input: &str,
        last_answer: Option<&str>,
        max_iterations: usize,
    ) -> Result<ToolLoopOutcome, AgentError> {
        if let Some(pending) = self.pending.take() {
            if !is_approval(input) {
                tracing::info!(command = %pending.command, "Pending modifier action cancelled");
                return Ok(canned(CANCELLED_MESSAGE));
            }
            tracing::info!(command = %pending.command, "Executing confirmed modifier action");
            self.remember(&pending.command);
            return run_tool_loop(
                model,
                &self.tools,
                prompts::MODIFIER_PROMPT,
                &prompts::modifier_confirmed(&pending.command),
                TOOL_TEMPERATURE,
                max_iterations,
            )
            .await;
        }

        if is_approval(input) && last_answer.is_some_and(needs_confirmation) {
            return Ok(canned(NOTHING_PENDING_MESSAGE));
        }

        let prompt = match last_answer {
            Some(answer) => {
                let recent: Vec<String> = self.recent.iter().cloned().collect();
                prompts::modifier_follow_up(answer, &recent, input)
            }
            None => input.to_string(),
        };
        self.remember(input);

        let outcome = run_tool_loop(
            model,
            &self.tools,
            prompts::MODIFIER_PROMPT,
            &prompt,
            TOOL_TEMPERATURE,
            max_iterations,
        )
        .await?;

        if needs_confirmation(&outcome.answer) {
            tracing::info!(command = input, "Modifier awaiting confirmation");
            self.pending = Some(PendingAction {
                command: input.to_string(),
            });
        }
        Ok(outcome)
    }
}

fn canned(answer: &str) -> ToolLoopOutcome {
    ToolLoopOutcome {
        answer: answer.to_string(),
        tool_calls: Vec::new(),
        iterations: 0,
    }
}
