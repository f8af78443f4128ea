use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ask-llama",
    version,
    about = "Multi-agent chat: documents, repositories, web search and math"
)]
pub struct Cli {
    /// Path to config file (overrides ./ask-llama.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for indexes and logs
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Agent selected at startup (general, document, repo, modifier, search, calculator)
        #[arg(short, long)]
        agent: Option<String>,

        /// Chat model name (overrides the provider default)
        #[arg(short, long)]
        model: Option<String>,

        /// Run without TUI (line-based REPL on stdin/stdout)
        #[arg(long)]
        headless: bool,

        /// Disable spoken replies
        #[arg(long)]
        no_voice: bool,
    },
    /// Check that GITHUB_API_TOKEN can reach a repository
    Validate {
        /// Repository URL or owner/repo; omit to only check the token
        repo_url: Option<String>,
    },
    /// List repositories the GITHUB_API_TOKEN can access
    Repos,
}
