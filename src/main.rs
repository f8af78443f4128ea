use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use ask_llama::agents::{Router, Services};
use ask_llama::cli::{Cli, Commands};
use ask_llama::config::{self, AppConfig, Credentials};
use ask_llama::github::validator::{
    list_accessible_repositories, probe_operations, recommendations, validate_setup,
};
use ask_llama::github::{GitHubClient, HostingApi, parse_repo_url};
use ask_llama::session::TranscriptLogger;
use ask_llama::voice::{Listener, Speaker};
use ask_llama::worker::Worker;
use ask_llama::{repl, tui};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may live in ./.env.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = config::load_config(&cli)?;
    let credentials = Credentials::from_env();

    match &cli.command {
        Commands::Chat { headless, .. } => {
            // The TUI owns the terminal, so its logs go to a file.
            let log_file = (!*headless).then(|| config.logs_dir().join("ask-llama.log"));
            init_logging(log_file.as_deref())?;
            tracing::info!(data_dir = %config.data_dir.display(), "ASK LLAMA starting");
            run_chat(config, credentials, *headless).await
        }
        Commands::Validate { repo_url } => {
            init_logging(None)?;
            let ready = run_validate(&credentials, repo_url.as_deref()).await?;
            if !ready {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Repos => {
            init_logging(None)?;
            run_repos(&credentials).await
        }
    }
}

fn init_logging(file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let writer = match file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(file.is_none())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
}

async fn run_chat(
    config: AppConfig,
    credentials: Credentials,
    headless: bool,
) -> anyhow::Result<()> {
    let services = Services::from_credentials(&config, &credentials);
    let has_model = services.chat.is_some();

    let speaker = Arc::new(Speaker::new(&config.voice));
    let listener = Listener::new(&config.voice, credentials.openai_api_key.clone())?;
    let transcript = if config.transcript_log {
        match TranscriptLogger::new(&config.logs_dir()) {
            Ok(logger) => Some(logger),
            Err(e) => {
                tracing::warn!(error = %e, "Transcript logging disabled");
                None
            }
        }
    } else {
        None
    };

    let router = Router::new(config, services);
    let worker = Worker::new(router, speaker, listener, transcript, has_model);

    if headless {
        repl::run_repl(worker).await
    } else {
        tui::run_tui(worker).await
    }
}

fn hosting_client(credentials: &Credentials) -> anyhow::Result<Option<GitHubClient>> {
    Ok(credentials
        .github_api_token
        .as_deref()
        .map(GitHubClient::new)
        .transpose()?)
}

/// Print the access report and, for a reachable repository, which
/// operations the token can perform. Returns whether the setup is usable.
async fn run_validate(credentials: &Credentials, repo_url: Option<&str>) -> anyhow::Result<bool> {
    let client = hosting_client(credentials)?;
    let api = client.as_ref().map(|c| c as &dyn HostingApi);

    let report = validate_setup(api, repo_url).await;
    println!("{}", report.render());

    if let (Some(api), Some(url)) = (api, repo_url)
        && report.ready()
    {
        let repo = api.get_repo(&parse_repo_url(url)?).await?;
        let probe = probe_operations(api, &repo).await?;
        println!(
            "Operations: read={} write={} create_branch={}",
            probe.read_contents, probe.write_access, probe.create_branch
        );
        for tip in recommendations(&probe) {
            println!("  - {tip}");
        }
    }

    Ok(report.ready())
}

async fn run_repos(credentials: &Credentials) -> anyhow::Result<()> {
    let Some(client) = hosting_client(credentials)? else {
        anyhow::bail!("GITHUB_API_TOKEN not found in environment variables");
    };
    let repos = list_accessible_repositories(&client, 50).await;
    if repos.is_empty() {
        println!("No accessible repositories found.");
    }
    for repo in repos {
        let visibility = if repo.private { "private" } else { "public" };
        println!("{} ({visibility}) {}", repo.full_name, repo.html_url);
    }
    Ok(())
}
