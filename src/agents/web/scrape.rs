//! Page fetching for the search agent.
//!
//! Pages are converted to markdown with `htmd`, skipping navigation and
//! script noise, and truncated before they are handed to the model. Hacker
//! News front pages get a dedicated story extractor.

use scraper::{ElementRef, Html, Selector};

/// Character limit for scraped page text.
pub const MAX_PAGE_CHARS: usize = 3000;

const HN_HOST: &str = "news.ycombinator.com";
const HN_MAX_STORIES: usize = 20;

/// Fetch `url` and return readable text for the model.
pub async fn scrape_website(http: &reqwest::Client, url: &str) -> Result<String, String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| format!("invalid URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported URL scheme '{}'", parsed.scheme()));
    }

    let response = http
        .get(parsed.clone())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.5")
        .send()
        .await
        .map_err(|e| format!("Error scraping {url}: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("Error scraping {url}: HTTP {status}"));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = response
        .text()
        .await
        .map_err(|e| format!("Error scraping {url}: failed to read body: {e}"))?;

    tracing::debug!(url, bytes = body.len(), content_type, "Fetched page");

    if parsed.host_str() == Some(HN_HOST) {
        return Ok(hacker_news_front_page(&body, url));
    }

    let text = if content_type.contains("html") || content_type.is_empty() {
        html_to_text(&body)
    } else {
        collapse_blank_lines(&body)
    };

    Ok(format!("Content from {url}:\n\n{}", truncate_chars(&text, MAX_PAGE_CHARS)))
}

/// Convert HTML to markdown without scripts, styles, navigation or footers.
pub fn html_to_text(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "footer", "noscript", "head"])
        .build();
    let markdown = converter.convert(html).unwrap_or_else(|_| html.to_string());
    collapse_blank_lines(&markdown)
}

/// Trim every line and keep at most one blank line between paragraphs.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Truncate to `limit` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HnStory {
    pub rank: usize,
    pub title: String,
    pub link: String,
    pub points: String,
    pub author: String,
    pub comments: String,
}

/// Extract the story list from a Hacker News listing page.
pub fn parse_hacker_news(html: &str) -> Vec<HnStory> {
    let document = Html::parse_document(html);
    let selectors = (
        Selector::parse("tr.athing"),
        Selector::parse("span.titleline > a, td.title a"),
        Selector::parse("td.subtext"),
        Selector::parse("span.score"),
        Selector::parse("a.hnuser"),
        Selector::parse("a"),
    );
    let (Ok(row_sel), Ok(title_sel), Ok(subtext_sel), Ok(score_sel), Ok(user_sel), Ok(a_sel)) =
        selectors
    else {
        return Vec::new();
    };

    let text_of = |el: ElementRef<'_>| el.text().collect::<String>().trim().to_string();

    let mut stories = Vec::new();
    for row in document.select(&row_sel).take(HN_MAX_STORIES) {
        let Some(title_link) = row.select(&title_sel).next() else {
            continue;
        };
        let title = text_of(title_link);
        if title.is_empty() {
            continue;
        }
        let href = title_link.value().attr("href").unwrap_or("");
        let link = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("https://{HN_HOST}/{}", href.trim_start_matches('/'))
        };

        let mut points = "0".to_string();
        let mut author = "Unknown".to_string();
        let mut comments = "0".to_string();

        let subtext = row
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .and_then(|next| next.select(&subtext_sel).next());
        if let Some(subtext) = subtext {
            if let Some(score) = subtext.select(&score_sel).next() {
                points = text_of(score)
                    .trim_end_matches(" points")
                    .trim_end_matches(" point")
                    .to_string();
            }
            if let Some(user) = subtext.select(&user_sel).next() {
                author = text_of(user);
            }
            if let Some(last) = subtext.select(&a_sel).last() {
                let label = text_of(last).to_lowercase();
                if label.contains("comment") {
                    comments = label
                        .chars()
                        .take_while(|c| c.is_ascii_digit())
                        .collect::<String>();
                    if comments.is_empty() {
                        comments = "0".to_string();
                    }
                }
            }
        }

        stories.push(HnStory {
            rank: stories.len() + 1,
            title,
            link,
            points,
            author,
            comments,
        });
    }
    stories
}

fn hacker_news_front_page(html: &str, url: &str) -> String {
    let stories = parse_hacker_news(html);
    if stories.is_empty() {
        return format!(
            "Could not extract stories from {url}. The page structure may have changed."
        );
    }
    let mut out = format!("Top Stories from Hacker News ({url}):\n\n");
    for s in &stories {
        out.push_str(&format!(
            "{}. {}\n   Points: {} | Author: {} | Comments: {}\n   Link: {}\n\n",
            s.rank, s.title, s.points, s.author, s.comments, s.link
        ));
    }
    out.trim_end().to_string()
}
