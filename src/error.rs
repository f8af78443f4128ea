use std::path::PathBuf;

/// Errors related to configuration loading and credential resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("{0}")]
    MissingCredential(String),
}

/// Errors related to running an external process.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to spawn `{program}`: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("`{program}` timed out after {timeout_secs}s")]
    TimedOut { program: String, timeout_secs: u64 },

    #[error("Process execution failed: {0}")]
    ProcessFailed(String),
}

/// Errors raised while talking to the language model.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{0}")]
    MissingCredential(String),

    #[error("No content in user message.")]
    EmptyInput,

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Agent stopped after {limit} tool iterations without an answer")]
    IterationLimit { limit: usize },

    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// Errors from the embedding service and the on-disk vector index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Embedding request failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Index was built with embedding model '{indexed}' but '{current}' is configured; \
         upload or process it again to rebuild"
    )]
    ModelMismatch { indexed: String, current: String },

    #[error("Invalid chunk configuration: {0}")]
    Chunking(String),

    #[error("Nothing to index")]
    Empty,
}

/// Errors from the Document agent's upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Only PDF documents are supported; '{name}' was rejected")]
    UnsupportedFile { name: String },

    #[error("'{name}' is not a readable PDF: {message}")]
    InvalidPdf { name: String, message: String },

    #[error("No documents were provided")]
    NoDocuments,

    #[error("No extractable text found in the uploaded documents")]
    NoText,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Errors from cloning and indexing a repository.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to clone repository: {0}")]
    CloneFailed(String),

    #[error("No files with extensions {extensions:?} found in repository")]
    NoMatchingFiles { extensions: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Errors from the GitHub REST API client.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error(
        "GitHub token is required. Please set GITHUB_API_TOKEN environment variable or provide it as parameter."
    )]
    MissingToken,

    #[error("Invalid GitHub URL format: {0}")]
    InvalidUrl(String),

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected GitHub response: {0}")]
    Decode(String),
}

impl GitHubError {
    /// HTTP status of an API rejection, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Errors from repository modifier operations.
#[derive(Debug, thiserror::Error)]
pub enum ModifierError {
    #[error("File path cannot be empty")]
    EmptyPath,

    #[error(
        "'{0}' is not a valid file path. Please specify a valid file name like 'README.md', 'main.py', etc."
    )]
    InvalidPath(String),

    #[error("File '{0}' not found. Use 'list_files' to explore the repository structure.")]
    NotFound(String),

    #[error("File '{path}' not found. Did you mean one of these?\n{suggestions}")]
    DidYouMean { path: String, suggestions: String },

    #[error("Path not found: '{0}'. The directory might be empty or the path doesn't exist.")]
    DirectoryNotFound(String),

    #[error("File {0} already exists. Use 'edit' instead of 'create' to update existing files.")]
    AlreadyExists(String),

    #[error("'{0}' is a directory, not a file")]
    IsDirectory(String),

    #[error("Authentication failed. Please check your GITHUB_API_TOKEN is valid and has the required permissions")]
    AuthenticationFailed,

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error(transparent)]
    Api(#[from] GitHubError),
}

/// Errors from speech recognition and synthesis.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Microphone error: {0}")]
    Recorder(String),

    #[error("No speech detected within timeout period. Please try again.")]
    NoSpeech,

    #[error("Sorry, I couldn't understand the audio. Please try again.")]
    NotUnderstood,

    #[error("Speech recognition service error: {0}")]
    Transcription(String),

    #[error("Speech recognition requires OPENAI_API_KEY to be set")]
    MissingCredential,

    #[error("TTS command failed: {0}")]
    Tts(String),
}

/// Errors from the sandboxed calculator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unknown function or constant '{0}'")]
    UnknownName(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("empty expression")]
    Empty,
}
