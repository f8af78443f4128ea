//! The agents a conversation can be routed to.
//!
//! [`AgentKind`] names the active mode; [`router::Router`] owns the
//! per-agent state and dispatches each input to the matching handler.

pub mod calculator;
pub mod document;
pub mod modifier;
pub mod prompts;
pub mod repo_reader;
pub mod router;
pub mod web;

use serde::Serialize;

pub use router::{Router, RouterReply, Services};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    General,
    Document,
    RepoQa,
    RepoModifier,
    WebSearch,
    Calculator,
}

impl AgentKind {
    /// Every agent in sidebar order.
    pub const ALL: [AgentKind; 6] = [
        AgentKind::General,
        AgentKind::Document,
        AgentKind::RepoQa,
        AgentKind::RepoModifier,
        AgentKind::WebSearch,
        AgentKind::Calculator,
    ];

    /// Parse a user-facing agent name. Accepts the short aliases shown in
    /// `/help` as well as the full labels.
    pub fn parse(name: &str) -> Option<AgentKind> {
        let normalized = name.trim().to_lowercase().replace(['-', '_'], " ");
        let kind = match normalized.as_str() {
            "general" | "chat" | "none" | "general chat" => AgentKind::General,
            "document" | "doc" | "docs" | "pdf" | "document agent" => AgentKind::Document,
            "repo" | "repoqa" | "repo qa" | "github repo agent" => AgentKind::RepoQa,
            "modifier" | "modify" | "repo modifier" | "github code modifier agent" => {
                AgentKind::RepoModifier
            }
            "search" | "web" | "web search" | "websearch" | "web scraping agent" => {
                AgentKind::WebSearch
            }
            "calculator" | "calc" | "math" | "calculator agent" => AgentKind::Calculator,
            _ => return None,
        };
        Some(kind)
    }

    pub fn label(self) -> &'static str {
        match self {
            AgentKind::General => "General Chat",
            AgentKind::Document => "Document Agent",
            AgentKind::RepoQa => "GitHub Repo Agent",
            AgentKind::RepoModifier => "GitHub Code Modifier Agent",
            AgentKind::WebSearch => "Web Scraping Agent",
            AgentKind::Calculator => "Calculator Agent",
        }
    }

    /// Short name used by `/agent` and the CLI.
    pub fn short_name(self) -> &'static str {
        match self {
            AgentKind::General => "general",
            AgentKind::Document => "document",
            AgentKind::RepoQa => "repo",
            AgentKind::RepoModifier => "modifier",
            AgentKind::WebSearch => "search",
            AgentKind::Calculator => "calculator",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AgentKind::General => "💬 General conversation with the model",
            AgentKind::Document => "📄 Ask questions about uploaded PDF documents",
            AgentKind::RepoQa => "📂 Analyze and answer questions about GitHub repositories",
            AgentKind::RepoModifier => "⚡ Create, edit, and manage files in GitHub repositories",
            AgentKind::WebSearch => "🌐 Scrape and analyze web content",
            AgentKind::Calculator => "🧮 Perform calculations and mathematical operations",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            AgentKind::General => prompts::GENERAL_PROMPT,
            AgentKind::Document => prompts::DOCUMENT_PROMPT,
            AgentKind::RepoQa => prompts::REPO_QA_PROMPT,
            AgentKind::RepoModifier => prompts::MODIFIER_PROMPT,
            AgentKind::WebSearch => prompts::WEB_PROMPT,
            AgentKind::Calculator => prompts::CALCULATOR_PROMPT,
        }
    }

    /// Agents that run through the function-calling tool loop.
    pub fn uses_tools(self) -> bool {
        matches!(
            self,
            AgentKind::RepoModifier | AgentKind::WebSearch | AgentKind::Calculator
        )
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_labels() {
        assert_eq!(AgentKind::parse("search"), Some(AgentKind::WebSearch));
        assert_eq!(AgentKind::parse("Calculator"), Some(AgentKind::Calculator));
        assert_eq!(AgentKind::parse("doc"), Some(AgentKind::Document));
        assert_eq!(AgentKind::parse("repo-qa"), Some(AgentKind::RepoQa));
        assert_eq!(
            AgentKind::parse("GitHub Code Modifier Agent"),
            Some(AgentKind::RepoModifier)
        );
        assert_eq!(AgentKind::parse("astrology"), None);
    }

    #[test]
    fn short_names_round_trip() {
        for kind in AgentKind::ALL {
            assert_eq!(AgentKind::parse(kind.short_name()), Some(kind));
            assert_eq!(AgentKind::parse(kind.label()), Some(kind));
        }
    }

    #[test]
    fn only_tool_agents_use_tools() {
        let tool_agents: Vec<_> = AgentKind::ALL.into_iter().filter(|k| k.uses_tools()).collect();
        assert_eq!(
            tool_agents,
            vec![
                AgentKind::RepoModifier,
                AgentKind::WebSearch,
                AgentKind::Calculator
            ]
        );
    }
}
