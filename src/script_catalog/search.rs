//! `searchInScripts`: a regex path (scans every script's source) and an
//! indexed path (non-regex, looks up the inverted index).

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use super::index::IdentifierIndexEntry;
use super::ParsedScript;
use crate::error::{Result, ServerError};

const DEFAULT_MAX_MATCHES: usize = 100;
const DEFAULT_CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub is_regex: bool,
    pub case_sensitive: bool,
    pub context_lines: usize,
    pub max_matches: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            is_regex: false,
            case_sensitive: false,
            context_lines: DEFAULT_CONTEXT_LINES,
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub script_id: String,
    pub url: String,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

pub fn search_in_scripts(
    scripts: &HashMap<String, ParsedScript>,
    keyword_index: &HashMap<String, Vec<IdentifierIndexEntry>>,
    keyword: &str,
    opts: SearchOptions,
) -> Result<Vec<SearchMatch>> {
    if keyword.is_empty() {
        return Err(ServerError::InvalidArgument("keyword must not be empty".into()));
    }

    if opts.is_regex {
        search_regex(scripts, keyword, &opts)
    } else {
        Ok(search_indexed(keyword_index, keyword, &opts))
    }
}

fn search_regex(
    scripts: &HashMap<String, ParsedScript>,
    pattern: &str,
    opts: &SearchOptions,
) -> Result<Vec<SearchMatch>> {
    let re: Regex = RegexBuilder::new(pattern)
        .case_insensitive(!opts.case_sensitive)
        .build()
        .map_err(|e| ServerError::InvalidArgument(format!("invalid regex `{pattern}`: {e}")))?;

    let mut matches = Vec::new();
    // Deterministic source order: iterate scripts sorted by id.
    let mut ordered: Vec<&ParsedScript> = scripts.values().filter(|s| s.source.is_some()).collect();
    ordered.sort_by(|a, b| a.script_id.cmp(&b.script_id));

    'outer: for script in ordered {
        let source = script.source.as_deref().unwrap_or_default();
        let lines: Vec<&str> = source.lines().collect();
        for (line_idx, line) in lines.iter().enumerate() {
            for m in re.find_iter(line) {
                let context_start = line_idx.saturating_sub(opts.context_lines);
                let context_end = std::cmp::min(lines.len(), line_idx + opts.context_lines + 1);
                matches.push(SearchMatch {
                    script_id: script.script_id.clone(),
                    url: script.url.clone(),
                    line: line_idx,
                    column: m.start(),
                    context: lines[context_start..context_end].join("\n"),
                });
                if matches.len() >= opts.max_matches {
                    break 'outer;
                }
            }
        }
    }

    Ok(matches)
}

fn search_indexed(
    keyword_index: &HashMap<String, Vec<IdentifierIndexEntry>>,
    keyword: &str,
    opts: &SearchOptions,
) -> Vec<SearchMatch> {
    let needle = keyword.to_lowercase();
    let mut candidate_tokens: Vec<&String> = keyword_index
        .keys()
        .filter(|token| token.contains(&needle))
        .collect();
    candidate_tokens.sort();

    let mut matches = Vec::new();
    'outer: for token in candidate_tokens {
        let mut entries: Vec<&IdentifierIndexEntry> = keyword_index[token].iter().collect();
        entries.sort_by(|a, b| (a.script_id.clone(), a.line, a.column).cmp(&(
            b.script_id.clone(),
            b.line,
            b.column,
        )));
        for entry in entries {
            matches.push(SearchMatch {
                script_id: entry.script_id.clone(),
                url: entry.url.clone(),
                line: entry.line,
                column: entry.column,
                context: entry.context.clone(),
            });
            if matches.len() >= opts.max_matches {
                break 'outer;
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::index::build_keyword_index;

    fn fixture() -> HashMap<String, ParsedScript> {
        let mut scripts = HashMap::new();
        scripts.insert(
            "s1".to_string(),
            ParsedScript {
                script_id: "s1".to_string(),
                url: "http://x/a.js".to_string(),
                start_line: 0,
                start_column: 0,
                end_line: 10,
                end_column: 0,
                source_length: 0,
                source: Some("function decryptPayload(buf) {\n  return xorDecrypt(buf);\n}".to_string()),
            },
        );
        scripts
    }

    #[test]
    fn regex_search_respects_max_matches() {
        let scripts = fixture();
        let opts = SearchOptions {
            is_regex: true,
            max_matches: 1,
            ..SearchOptions::default()
        };
        let matches = search_in_scripts(&scripts, &HashMap::new(), "decrypt", opts).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn indexed_search_finds_substring_tokens() {
        let scripts = fixture();
        let mut index = HashMap::new();
        for entry in build_keyword_index("s1", &scripts["s1"].url, scripts["s1"].source.as_ref().unwrap()) {
            index.entry(entry.token.clone()).or_insert_with(Vec::new).push(entry);
        }
        let matches = search_in_scripts(&scripts, &index, "decrypt", SearchOptions::default()).unwrap();
        assert!(matches.iter().any(|m| m.line == 0));
        assert!(matches.iter().any(|m| m.line == 1));
    }

    #[test]
    fn empty_keyword_is_invalid_argument() {
        let err = search_in_scripts(&fixture(), &HashMap::new(), "", SearchOptions::default())
            .unwrap_err();
        assert_eq!(err.category(), "invalid_argument");
    }
}
