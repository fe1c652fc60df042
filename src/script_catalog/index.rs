//! Inverted keyword index over identifier tokens, built line by line.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z_$][A-Za-z0-9_$]{2,}\b").expect("valid regex"));

const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct IdentifierIndexEntry {
    pub script_id: String,
    pub url: String,
    pub line: usize,
    pub column: usize,
    pub context: String,
    /// The lowercased token this entry is filed under; not part of the
    /// public shape returned to callers but kept here so the builder can
    /// route entries into the catalog's map in one pass.
    #[serde(skip)]
    pub token: String,
}

/// Tokenizes `source` line by line and returns one entry per identifier
/// occurrence (duplicates within the same line are kept deliberately:
/// call-site count matters to the reverse-engineering workflow this index
/// serves).
pub fn build_keyword_index(script_id: &str, url: &str, source: &str) -> Vec<IdentifierIndexEntry> {
    let lines: Vec<&str> = source.lines().collect();
    let mut entries = Vec::new();

    for (line_idx, line) in lines.iter().enumerate() {
        for m in IDENTIFIER_RE.find_iter(line) {
            let context_start = line_idx.saturating_sub(CONTEXT_LINES);
            let context_end = std::cmp::min(lines.len(), line_idx + CONTEXT_LINES + 1);
            let context = lines[context_start..context_end].join("\n");

            entries.push(IdentifierIndexEntry {
                script_id: script_id.to_string(),
                url: url.to_string(),
                line: line_idx,
                column: m.start(),
                context,
                token: m.as_str().to_lowercase(),
            });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_every_identifier_occurrence_on_a_line() {
        let source = "const fooBar = fooBar + fooBar;\nlet other = 1;";
        let entries = build_keyword_index("s1", "http://x/a.js", source);
        let foo_bar_hits: Vec<_> = entries.iter().filter(|e| e.token == "foobar").collect();
        assert_eq!(foo_bar_hits.len(), 3);
        assert!(foo_bar_hits.iter().all(|e| e.line == 0));
    }

    #[test]
    fn building_twice_is_deterministic() {
        let source = "function handler(event) { return event.data; }";
        let a = build_keyword_index("s1", "u", source);
        let b = build_keyword_index("s1", "u", source);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.token, y.token);
            assert_eq!(x.line, y.line);
            assert_eq!(x.column, y.column);
        }
    }

    #[test]
    fn rejects_short_tokens() {
        let source = "if (x) { a(b); }";
        let entries = build_keyword_index("s1", "u", source);
        assert!(entries.is_empty());
    }
}
