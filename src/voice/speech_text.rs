//! Turn a markdown reply into something a TTS engine can read aloud.

use std::sync::LazyLock;

use regex::Regex;

pub const CONTINUES_SUFFIX: &str = " [Response continues in chat]";

static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("invalid code block regex"));
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("invalid inline code regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("invalid bold regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("invalid italic regex"));
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#{1,6}\s+").expect("invalid header regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("invalid link regex"));

/// Strip markdown: code blocks become `[Code block]`; inline code, bold,
/// italic and links keep only their text; header markers are dropped.
pub fn clean_markdown(text: &str) -> String {
    let text = text.trim();
    let text = CODE_BLOCK_RE.replace_all(text, "[Code block]");
    let text = INLINE_CODE_RE.replace_all(&text, "$1");
    let text = BOLD_RE.replace_all(&text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = HEADER_RE.replace_all(&text, "");
    let text = LINK_RE.replace_all(&text, "$1");
    text.into_owned()
}

/// Cut `text` to at most `limit` characters. The cut lands after the last
/// sentence end in the kept part when that is past 60% of the limit.
pub fn truncate_for_speech(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .nth(limit)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];

    let min_break = limit * 3 / 5;
    match head.rfind(['.', '!', '?']) {
        Some(pos) if head[..pos].chars().count() > min_break => {
            format!("{}{CONTINUES_SUFFIX}", &head[..=pos])
        }
        _ => format!("{head}{CONTINUES_SUFFIX}"),
    }
}

pub fn prepare_speech(text: &str, limit: usize) -> String {
    truncate_for_speech(&clean_markdown(text), limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown() {
        let md = "## Result\n**Bold** and *italic* with `code` and [a link](https://x.y).\n\
                  ```rust\nfn main() {}\n```\nDone.";
        assert_eq!(
            clean_markdown(md),
            "Result\nBold and italic with code and a link.\n[Code block]\nDone."
        );
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_speech("Hello there.", 500), "Hello there.");
    }

    #[test]
    fn breaks_at_a_late_sentence_end() {
        let text = format!("{}. {}", "a".repeat(350), "b".repeat(300));
        let out = truncate_for_speech(&text, 500);
        assert_eq!(out, format!("{}.{CONTINUES_SUFFIX}", "a".repeat(350)));
    }

    #[test]
    fn early_sentence_end_is_ignored() {
        let text = format!("{}. {}", "a".repeat(100), "b".repeat(600));
        let out = truncate_for_speech(&text, 500);
        assert_eq!(out.chars().count(), 500 + CONTINUES_SUFFIX.chars().count());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(600);
        let out = truncate_for_speech(&text, 500);
        assert!(out.starts_with(&"é".repeat(500)));
    }
}
