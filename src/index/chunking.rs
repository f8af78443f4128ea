use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, TextSplitter};

use crate::error::IndexError;

/// Split `text` into chunks of at most `chunk_size` characters with
/// `overlap` characters shared between neighbours. Blank chunks are dropped.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, IndexError> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| IndexError::Chunking(e.to_string()))?;
    let splitter = TextSplitter::new(config);

    Ok(splitter
        .chunks(text)
        .filter(|chunk| !chunk.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Stable id of a chunk: hash of its source, position and text.
pub fn chunk_id(source: &str, ordinal: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(ordinal.to_le_bytes());
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("hello world", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn long_text_respects_chunk_size() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(100);
        let chunks = split_text(&text, 200, 40).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(split_text("   \n\n  ", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn overlap_not_below_size_is_rejected() {
        assert!(matches!(
            split_text("abc", 10, 10),
            Err(IndexError::Chunking(_))
        ));
    }

    #[test]
    fn chunk_ids_differ_by_position() {
        let a = chunk_id("doc.pdf", 0, "same");
        let b = chunk_id("doc.pdf", 1, "same");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(a, chunk_id("doc.pdf", 0, "same"));
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
