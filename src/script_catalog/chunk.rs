//! Fixed-size, deterministic, non-overlapping script chunking.

use serde::Serialize;

pub const CHUNK_SIZE: usize = 100 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct ScriptChunk {
    pub script_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub size: usize,
}

/// Splits `source` into chunks of at most `CHUNK_SIZE` bytes, never
/// splitting a UTF-8 character across a boundary. The concatenation of
/// every chunk's `content` equals `source`.
pub fn chunk_script(script_id: &str, source: &str) -> Vec<ScriptChunk> {
    let bytes = source.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    while start < bytes.len() {
        let mut end = std::cmp::min(start + CHUNK_SIZE, bytes.len());
        while end < bytes.len() && !source.is_char_boundary(end) {
            end -= 1;
        }
        let content = source[start..end].to_string();
        let size = content.len();
        chunks.push(ScriptChunk {
            script_id: script_id.to_string(),
            chunk_index: index,
            content,
            size,
        });
        start = end;
        index += 1;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_matches_ceil_division() {
        let source = "x".repeat(CHUNK_SIZE * 2 + 137);
        let chunks = chunk_script("s1", &source);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].size, CHUNK_SIZE);
        assert_eq!(chunks[1].size, CHUNK_SIZE);
        assert_eq!(chunks[2].size, 137);
    }

    #[test]
    fn concatenation_round_trips_to_source() {
        let source = "const x = 1;\n".repeat(20_000);
        let chunks = chunk_script("s2", &source);
        let rejoined: String = chunks.into_iter().map(|c| c.content).collect();
        assert_eq!(rejoined, source);
    }

    #[test]
    fn empty_source_yields_no_chunks() {
        assert!(chunk_script("s3", "").is_empty());
    }

    #[test]
    fn chunking_is_deterministic() {
        let source = "function f() { return 42; }".repeat(5000);
        let a = chunk_script("s4", &source);
        let b = chunk_script("s4", &source);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.content, y.content);
        }
    }

    #[test]
    fn never_splits_a_multibyte_character() {
        // Each 'é' is 2 bytes in UTF-8; pad so a naive byte-offset split
        // would land mid-character.
        let source = format!("{}{}", "a".repeat(CHUNK_SIZE - 1), "é".repeat(10));
        let chunks = chunk_script("s5", &source);
        for chunk in &chunks {
            assert!(chunk.content.is_char_boundary(chunk.content.len()));
        }
        let rejoined: String = chunks.into_iter().map(|c| c.content).collect();
        assert_eq!(rejoined, source);
    }
}
