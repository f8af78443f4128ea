//! Search agent tools: web search, page scraping and news.

pub mod scrape;
pub mod search;

use std::time::Duration;

use async_trait::async_trait;
use genai::chat::{Tool, ToolCall};
use serde_json::json;

use crate::config::SearchConfig;
use crate::llm::{ToolSet, str_arg, tool_error};

pub use scrape::{html_to_text, parse_hacker_news, scrape_website};
pub use search::{SearchProvider, SearchResult, WebSearch, format_results, parse_ddg_lite_html};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const HTTP_TIMEOUT_SECS: u64 = 15;

/// How many search hits `search_and_scrape` opens.
const SCRAPE_TOP_RESULTS: usize = 3;

pub struct WebTools {
    http: reqwest::Client,
    search: WebSearch,
    max_results: usize,
}

impl WebTools {
    pub fn new(config: &SearchConfig, brave_api_key: Option<&str>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        let provider = SearchProvider::select(&config.provider, brave_api_key);
        tracing::debug!(provider = provider.name(), "Web tools ready");
        Ok(Self {
            search: WebSearch::new(http.clone(), provider, config.rate_limit_secs),
            http,
            max_results: config.max_results,
        })
    }

    fn count_arg(&self, call: &ToolCall) -> usize {
        call.fn_arguments
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|n| (n as usize).clamp(1, 20))
            .unwrap_or(self.max_results)
    }

    async fn search_web(&self, query: &str, count: usize) -> String {
        match self.search.search(query, count).await {
            Ok(results) if results.is_empty() => format!("No results found for '{query}'"),
            Ok(results) => format_results(&format!("Search results for '{query}'"), &results),
            Err(e) => tool_error(format!("search_web: {e}")),
        }
    }

    async fn search_news(&self, query: &str, count: usize) -> String {
        match self.search.search_news(query, count).await {
            Ok(results) if results.is_empty() => format!("No news found for '{query}'"),
            Ok(results) => format_results(&format!("News results for '{query}'"), &results),
            Err(e) => tool_error(format!("search_news: {e}")),
        }
    }

    async fn scrape(&self, url: &str) -> String {
        match scrape_website(&self.http, url).await {
            Ok(text) => text,
            Err(e) => tool_error(format!("scrape_website: {e}")),
        }
    }

    async fn search_and_scrape(&self, query: &str) -> String {
        let results = match self.search.search(query, SCRAPE_TOP_RESULTS).await {
            Ok(r) if r.is_empty() => return format!("No results found for '{query}'"),
            Ok(r) => r,
            Err(e) => return tool_error(format!("search_and_scrape: {e}")),
        };

        let mut out = format!("Search and scrape results for '{query}':\n\n");
        for (i, result) in results.iter().enumerate() {
            let content = match scrape_website(&self.http, &result.url).await {
                Ok(text) => text,
                Err(e) => format!("Error scraping: {e}"),
            };
            out.push_str(&format!("Result {}: {}\n{}\n\n", i + 1, result.title, content));
        }
        out.trim_end().to_string()
    }
}

#[async_trait]
impl ToolSet for WebTools {
    fn definitions(&self) -> Vec<Tool> {
        let query_schema = |description: &str| {
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": description },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results (default 5)"
                    }
                },
                "required": ["query"]
            })
        };

        vec![
            Tool::new("search_web")
                .with_description(
                    "Search the web. Returns a numbered list of results with title, URL and \
                     snippet.",
                )
                .with_schema(query_schema("Search query, e.g. 'Python tutorials'")),
            Tool::new("scrape_website")
                .with_description(
                    "Fetch a web page and return its readable text (first 3000 characters). \
                     Hacker News listing pages return the top stories with points, author \
                     and comment counts.",
                )
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "Absolute http(s) URL, e.g. 'https://news.ycombinator.com'"
                        }
                    },
                    "required": ["url"]
                })),
            Tool::new("search_and_scrape")
                .with_description(
                    "Search the web and scrape the top 3 results. Use when snippets are not \
                     enough to answer.",
                )
                .with_schema(json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search query" }
                    },
                    "required": ["query"]
                })),
            Tool::new("search_news")
                .with_description("Search for recent news articles on a topic.")
                .with_schema(query_schema("News topic, e.g. 'climate change'")),
        ]
    }

    async fn dispatch(&self, call: &ToolCall) -> String {
        match call.fn_name.as_str() {
            "search_web" => match str_arg(call, "query") {
                Ok(q) => self.search_web(q, self.count_arg(call)).await,
                Err(e) => tool_error(e),
            },
            "scrape_website" => match str_arg(call, "url") {
                Ok(url) => self.scrape(url.trim()).await,
                Err(e) => tool_error(e),
            },
            "search_and_scrape" => match str_arg(call, "query") {
                Ok(q) => self.search_and_scrape(q).await,
                Err(e) => tool_error(e),
            },
            "search_news" => match str_arg(call, "query") {
                Ok(q) => self.search_news(q, self.count_arg(call)).await,
                Err(e) => tool_error(e),
            },
            other => tool_error(format!("Unknown tool: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tool_call;

    fn tools() -> WebTools {
        let config = SearchConfig {
            max_results: 5,
            rate_limit_secs: 0.0,
            provider: "duckduckgo".to_string(),
        };
        WebTools::new(&config, None).unwrap()
    }

    #[test]
    fn exposes_four_tools() {
        let names: Vec<String> = tools()
            .definitions()
            .iter()
            .map(|t| t.name.as_str().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["search_web", "scrape_website", "search_and_scrape", "search_news"]
        );
    }

    #[tokio::test]
    async fn bad_arguments_are_reported_without_network() {
        let t = tools();
        let out = t.dispatch(&tool_call("search_web", json!({}))).await;
        assert!(out.contains("missing or invalid 'query'"));

        let out = t
            .dispatch(&tool_call("scrape_website", json!({"url": "ftp://example.com"})))
            .await;
        assert!(out.contains("unsupported URL scheme"));

        let out = t.dispatch(&tool_call("shell_exec", json!({}))).await;
        assert!(out.contains("Unknown tool"));
    }

    #[test]
    fn max_results_argument_is_clamped() {
        let t = tools();
        assert_eq!(t.count_arg(&tool_call("search_web", json!({"query": "x"}))), 5);
        assert_eq!(
            t.count_arg(&tool_call("search_web", json!({"query": "x", "max_results": 100}))),
            20
        );
    }
}
