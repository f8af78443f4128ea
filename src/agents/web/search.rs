//! Web search providers for the search agent.
//!
//! DuckDuckGo (zero-config, lite HTML scraping) is the default; Brave Search
//! is used when configured and `BRAVE_API_KEY` is set. Each provider has its
//! own rate limiter so back-to-back tool calls don't get the client blocked.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use scraper::{Html, Selector};
use serde::Serialize;

const DDG_LITE_URL: &str = "https://lite.duckduckgo.com/lite/";
const BRAVE_WEB_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const BRAVE_NEWS_URL: &str = "https://api.search.brave.com/res/v1/news/search";

/// A single search result with title, URL, and snippet.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchProvider {
    DuckDuckGo,
    Brave { api_key: String },
}

impl SearchProvider {
    /// Brave when it is the configured provider and a key is available,
    /// DuckDuckGo otherwise.
    pub fn select(configured: &str, brave_api_key: Option<&str>) -> Self {
        match (configured.trim().to_lowercase().as_str(), brave_api_key) {
            ("brave", Some(key)) => SearchProvider::Brave {
                api_key: key.to_string(),
            },
            ("brave", None) => {
                tracing::warn!("Search provider 'brave' needs BRAVE_API_KEY; using DuckDuckGo");
                SearchProvider::DuckDuckGo
            }
            ("duckduckgo" | "ddg", _) => SearchProvider::DuckDuckGo,
            (other, _) => {
                tracing::warn!(provider = other, "Unknown search provider; using DuckDuckGo");
                SearchProvider::DuckDuckGo
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchProvider::DuckDuckGo => "DuckDuckGo",
            SearchProvider::Brave { .. } => "Brave",
        }
    }
}

/// Minimum interval between requests to one provider.
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_secs: f64) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(min_secs.max(0.0)),
            last: Mutex::new(None),
        }
    }

    /// Sleep until the interval since the previous request has passed, then
    /// record this request.
    pub async fn wait(&self) {
        // Lock is released before sleeping.
        let remaining = {
            let guard = self.last.lock().unwrap();
            guard.and_then(|last| self.min_interval.checked_sub(last.elapsed()))
        };

        if let Some(wait) = remaining {
            tokio::time::sleep(wait).await;
        }

        *self.last.lock().unwrap() = Some(Instant::now());
    }
}

pub struct WebSearch {
    http: reqwest::Client,
    provider: SearchProvider,
    limiter: RateLimiter,
}

impl WebSearch {
    pub fn new(http: reqwest::Client, provider: SearchProvider, rate_limit_secs: f64) -> Self {
        Self {
            http,
            provider,
            limiter: RateLimiter::new(rate_limit_secs),
        }
    }

    pub fn provider(&self) -> &SearchProvider {
        &self.provider
    }

    pub async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>, String> {
        self.limiter.wait().await;
        tracing::info!(provider = self.provider.name(), query, count, "Web search");
        match &self.provider {
            SearchProvider::DuckDuckGo => self.duckduckgo(query, count, None).await,
            SearchProvider::Brave { api_key } => {
                self.brave(BRAVE_WEB_URL, "web", query, count, api_key).await
            }
        }
    }

    /// Recent news. DuckDuckGo lite has no news vertical, so the query is
    /// narrowed with "news" and restricted to the past week.
    pub async fn search_news(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchResult>, String> {
        self.limiter.wait().await;
        tracing::info!(provider = self.provider.name(), query, count, "News search");
        match &self.provider {
            SearchProvider::DuckDuckGo => {
                self.duckduckgo(&format!("{query} news"), count, Some("w")).await
            }
            SearchProvider::Brave { api_key } => {
                self.brave(BRAVE_NEWS_URL, "news", query, count, api_key).await
            }
        }
    }

    async fn duckduckgo(
        &self,
        query: &str,
        count: usize,
        date_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>, String> {
        let mut params = vec![("q", query)];
        if let Some(df) = date_filter {
            params.push(("df", df));
        }

        let resp = self
            .http
            .get(DDG_LITE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| format!("DuckDuckGo request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("DuckDuckGo HTTP {status}"));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| format!("failed to read DuckDuckGo response: {e}"))?;

        Ok(parse_ddg_lite_html(&html, count))
    }

    async fn brave(
        &self,
        endpoint: &str,
        section: &str,
        query: &str,
        count: usize,
        api_key: &str,
    ) -> Result<Vec<SearchResult>, String> {
        let resp = self
            .http
            .get(endpoint)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await
            .map_err(|e| format!("Brave request failed: {e}"))?;

        let status = resp.status();
        match status.as_u16() {
            401 => return Err("Brave API key is invalid or expired".to_string()),
            429 => return Err("Brave Search rate limit exceeded, try again later".to_string()),
            _ if !status.is_success() => return Err(format!("Brave HTTP {status}")),
            _ => {}
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| format!("failed to parse Brave response: {e}"))?;

        // The web endpoint nests results under "web"; news returns them at the top.
        let results = if section == "web" {
            &body["web"]["results"]
        } else {
            &body["results"]
        };
        Ok(parse_brave_results(results, count))
    }
}

fn parse_brave_results(results: &serde_json::Value, count: usize) -> Vec<SearchResult> {
    results
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|r| {
                    Some(SearchResult {
                        title: r["title"].as_str()?.to_string(),
                        url: r["url"].as_str()?.to_string(),
                        snippet: r["description"].as_str().unwrap_or("").to_string(),
                    })
                })
                .take(count)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse DuckDuckGo lite HTML.
///
/// The lite page is a table: each result is an `a.result-link` row followed
/// by a `td.result-snippet` row.
pub fn parse_ddg_lite_html(html: &str, count: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    let (Ok(link_selector), Ok(snippet_selector)) = (
        Selector::parse("a.result-link"),
        Selector::parse("td.result-snippet"),
    ) else {
        return Vec::new();
    };

    let snippets: Vec<String> = document
        .select(&snippet_selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    document
        .select(&link_selector)
        .enumerate()
        .filter_map(|(i, link)| {
            let title = link.text().collect::<String>().trim().to_string();
            let href = link.value().attr("href").unwrap_or("").trim();
            if title.is_empty() || href.is_empty() {
                return None;
            }
            Some(SearchResult {
                title,
                url: resolve_ddg_redirect(href),
                snippet: snippets.get(i).cloned().unwrap_or_default(),
            })
        })
        .take(count)
        .collect()
}

/// DuckDuckGo sometimes wraps result links in `//duckduckgo.com/l/?uddg=<url>`.
fn resolve_ddg_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    if let Ok(url) = reqwest::Url::parse(&absolute)
        && url.host_str().is_some_and(|h| h.ends_with("duckduckgo.com"))
        && url.path().starts_with("/l/")
        && let Some((_, target)) = url.query_pairs().find(|(k, _)| k == "uddg")
    {
        return target.into_owned();
    }
    absolute
}

/// Numbered plain-text listing the model reads as the tool result.
pub fn format_results(heading: &str, results: &[SearchResult]) -> String {
    let mut out = format!("{heading}:\n\n");
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   URL: {}\n   Snippet: {}\n\n",
            i + 1,
            r.title,
            r.url,
            r.snippet
        ));
    }
    out.trim_end().to_string()
}
