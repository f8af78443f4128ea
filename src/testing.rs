//! In-process fakes for the model, embedding and hosting seams.
//!
//! Used by unit tests and the integration tests under `tests/`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use genai::chat::{ChatRequest, ToolCall};

use crate::error::{AgentError, GitHubError, IndexError};
use crate::github::{
    BranchRef, CodeSearchHit, CommitResult, CommitSummary, ContentEntry, Contents, EntryKind,
    FileContent, FileRef, HostingApi, Permissions, RepoId, RepoInfo, UserInfo,
};
use crate::llm::{ChatModel, ChatTurn, Embedder};

/// Build a tool call with a fixed id.
pub fn tool_call(fn_name: &str, args: serde_json::Value) -> ToolCall {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    ToolCall {
        call_id: format!("call-{}", NEXT.fetch_add(1, Ordering::Relaxed)),
        fn_name: fn_name.to_string(),
        fn_arguments: args,
        thought_signatures: None,
    }
}

/// Replies with pre-scripted turns and records every request.
///
/// When the script runs out it answers `"ok"`. A model built with
/// [`ScriptedChatModel::failing`] returns an error on every call.
pub struct ScriptedChatModel {
    script: Mutex<VecDeque<ChatTurn>>,
    requests: Mutex<Vec<ChatRequest>>,
    temperatures: Mutex<Vec<f64>>,
    failure: Option<String>,
}

impl ScriptedChatModel {
    pub fn new(script: Vec<ChatTurn>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| ChatTurn::text(*t)).collect())
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.temperatures.lock().unwrap().clone()
    }

    /// Text of every message in the most recent request, joined by newlines.
    pub fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|req| {
                let mut parts: Vec<String> = req.system.iter().cloned().collect();
                parts.extend(
                    req.messages
                        .iter()
                        .filter_map(|m| m.content.first_text().map(str::to_string)),
                );
                parts.join("\n")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(
        &self,
        request: ChatRequest,
        temperature: f64,
    ) -> Result<ChatTurn, AgentError> {
        self.requests.lock().unwrap().push(request);
        self.temperatures.lock().unwrap().push(temperature);
        if let Some(msg) = &self.failure {
            return Err(AgentError::LlmError(msg.clone()));
        }
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatTurn::text("ok")))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Embeds text as keyword counts, one dimension per keyword plus a constant
/// dimension so no vector is all zeros.
pub struct KeywordEmbedder {
    keywords: Vec<String>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let mut v: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| lower.matches(k.as_str()).count() as f32)
                    .collect();
                v.push(0.1);
                v
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// A single repository held in memory behind [`HostingApi`].
pub struct InMemoryRepo {
    id: RepoId,
    files: Mutex<BTreeMap<String, (String, String)>>,
    branches: Mutex<BTreeMap<String, String>>,
    commits: AtomicUsize,
    invalid_token: bool,
}

impl InMemoryRepo {
    pub fn new(owner: &str, name: &str) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert("main".to_string(), "c0".to_string());
        Self {
            id: RepoId {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            files: Mutex::new(BTreeMap::new()),
            branches: Mutex::new(branches),
            commits: AtomicUsize::new(0),
            invalid_token: false,
        }
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        let sha = format!("sha-{path}");
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (content.to_string(), sha));
        self
    }

    pub fn with_invalid_token(mut self) -> Self {
        self.invalid_token = true;
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).map(|(c, _)| c.clone())
    }

    pub fn repo_info(&self) -> RepoInfo {
        RepoInfo {
            name: self.id.name.clone(),
            full_name: self.id.full_name(),
            html_url: format!("https://github.com/{}", self.id),
            private: false,
            default_branch: "main".to_string(),
            description: None,
            permissions: Some(Permissions {
                admin: false,
                push: true,
                pull: true,
            }),
        }
    }

    fn check(&self, repo: &RepoId) -> Result<(), GitHubError> {
        if self.invalid_token {
            return Err(not_ok(401, "Bad credentials"));
        }
        if *repo != self.id {
            return Err(not_ok(404, "Not Found"));
        }
        Ok(())
    }

    fn next_commit(&self) -> String {
        format!("c{}", self.commits.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

fn not_ok(status: u16, message: &str) -> GitHubError {
    GitHubError::Api {
        status,
        message: message.to_string(),
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[async_trait]
impl HostingApi for InMemoryRepo {
    async fn current_user(&self) -> Result<UserInfo, GitHubError> {
        if self.invalid_token {
            return Err(not_ok(401, "Bad credentials"));
        }
        Ok(UserInfo {
            login: "tester".to_string(),
        })
    }

    async fn get_repo(&self, repo: &RepoId) -> Result<RepoInfo, GitHubError> {
        self.check(repo)?;
        Ok(self.repo_info())
    }

    async fn list_user_repos(&self, limit: usize) -> Result<Vec<RepoInfo>, GitHubError> {
        self.check(&self.id)?;
        Ok(vec![self.repo_info()].into_iter().take(limit).collect())
    }

    async fn get_contents(&self, repo: &RepoId, file: &FileRef) -> Result<Contents, GitHubError> {
        self.check(repo)?;
        let files = self.files.lock().unwrap();
        let path = file.path.trim_matches('/');

        if let Some((content, sha)) = files.get(path) {
            return Ok(Contents::File(FileContent {
                name: basename(path).to_string(),
                path: path.to_string(),
                content: content.clone(),
                size: content.len() as u64,
                sha: sha.clone(),
                url: None,
            }));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for (p, (content, sha)) in files.iter() {
            let Some(rest) = p.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
                None => entries.push(ContentEntry {
                    name: rest.to_string(),
                    path: p.clone(),
                    kind: EntryKind::File,
                    size: Some(content.len() as u64),
                    sha: sha.clone(),
                    url: None,
                }),
            }
        }
        if entries.is_empty() && dirs.is_empty() && !path.is_empty() {
            return Err(not_ok(404, "Not Found"));
        }
        for dir in dirs {
            entries.push(ContentEntry {
                name: dir.clone(),
                path: format!("{prefix}{dir}"),
                kind: EntryKind::Dir,
                size: None,
                sha: String::new(),
                url: None,
            });
        }
        Ok(Contents::Dir(entries))
    }

    async fn put_file(
        &self,
        repo: &RepoId,
        file: &FileRef,
        content: &str,
        _message: &str,
        sha: Option<&str>,
    ) -> Result<CommitResult, GitHubError> {
        self.check(repo)?;
        let mut files = self.files.lock().unwrap();
        match (files.get(&file.path), sha) {
            (Some(_), None) => return Err(not_ok(422, "\"sha\" wasn't supplied.")),
            (Some((_, current)), Some(given)) if current != given => {
                return Err(not_ok(409, "sha mismatch"));
            }
            (None, Some(_)) => return Err(not_ok(404, "Not Found")),
            _ => {}
        }
        let commit = self.next_commit();
        files.insert(
            file.path.clone(),
            (content.to_string(), format!("sha-{}-{commit}", file.path)),
        );
        Ok(CommitResult {
            commit,
            path: file.path.clone(),
        })
    }

    async fn delete_file(
        &self,
        repo: &RepoId,
        file: &FileRef,
        _message: &str,
        sha: &str,
    ) -> Result<CommitResult, GitHubError> {
        self.check(repo)?;
        let mut files = self.files.lock().unwrap();
        match files.get(&file.path) {
            Some((_, current)) if current == sha => {
                files.remove(&file.path);
                Ok(CommitResult {
                    commit: self.next_commit(),
                    path: file.path.clone(),
                })
            }
            Some(_) => Err(not_ok(409, "sha mismatch")),
            None => Err(not_ok(404, "Not Found")),
        }
    }

    async fn search_code(
        &self,
        repo: &RepoId,
        query: &str,
    ) -> Result<Vec<CodeSearchHit>, GitHubError> {
        self.check(repo)?;
        let needle = query.to_lowercase();
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, (c, _))| {
                c.to_lowercase().contains(&needle) || p.to_lowercase().contains(&needle)
            })
            .map(|(p, _)| CodeSearchHit {
                name: basename(p).to_string(),
                path: p.clone(),
                url: format!("https://github.com/{}/blob/main/{p}", self.id),
                score: 1.0,
            })
            .collect())
    }

    async fn list_commits(
        &self,
        repo: &RepoId,
        path: &str,
        _limit: usize,
    ) -> Result<Vec<CommitSummary>, GitHubError> {
        self.check(repo)?;
        if !self.files.lock().unwrap().contains_key(path) {
            return Ok(Vec::new());
        }
        Ok(vec![CommitSummary {
            sha: "c0".to_string(),
            message: format!("Add {path}"),
            author: "tester".to_string(),
            date: "2024-01-01T00:00:00Z".to_string(),
        }])
    }

    async fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, GitHubError> {
        self.check(repo)?;
        self.branches
            .lock()
            .unwrap()
            .get(branch)
            .cloned()
            .ok_or_else(|| not_ok(404, "Branch not found"))
    }

    async fn create_branch(
        &self,
        repo: &RepoId,
        branch_name: &str,
        sha: &str,
    ) -> Result<BranchRef, GitHubError> {
        self.check(repo)?;
        let mut branches = self.branches.lock().unwrap();
        if branches.contains_key(branch_name) {
            return Err(not_ok(422, "Reference already exists"));
        }
        branches.insert(branch_name.to_string(), sha.to_string());
        Ok(BranchRef {
            branch_name: branch_name.to_string(),
            sha: sha.to_string(),
            url: format!(
                "https://api.github.com/repos/{}/git/refs/heads/{branch_name}",
                self.id
            ),
        })
    }
}
