//! Script Catalog (spec §4.F): a content-addressed, chunked,
//! keyword-indexed store of every script the browser parses.

pub mod chunk;
pub mod function_tree;
pub mod index;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::debugger as cdp_debugger;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::browser::CdpSession;
use crate::cache::{CacheInstance, CacheStats};
use crate::error::{Result, ServerError};

pub use chunk::{ScriptChunk, CHUNK_SIZE};
pub use index::IdentifierIndexEntry;

#[derive(Debug, Clone, Serialize)]
pub struct ParsedScript {
    pub script_id: String,
    pub url: String,
    pub start_line: i64,
    pub start_column: i64,
    pub end_line: i64,
    pub end_column: i64,
    pub source_length: usize,
    #[serde(skip)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub script_count: usize,
    pub scripts_with_source: usize,
    pub total_chunks: usize,
    pub index_keys: usize,
}

struct Inner {
    scripts: HashMap<String, ParsedScript>,
    by_url: HashMap<String, Vec<String>>,
    chunks: HashMap<String, Vec<ScriptChunk>>,
    keyword_index: HashMap<String, Vec<IdentifierIndexEntry>>,
}

pub struct ScriptCatalog {
    session: CdpSession,
    inner: RwLock<Inner>,
}

impl ScriptCatalog {
    /// Enables `Debugger` on its own CDP session and subscribes to
    /// `scriptParsed`, per spec: Script Catalog owns no domain other than
    /// a read-only view of `Debugger.scriptParsed` events (it never sets
    /// breakpoints; that's the Debugger Core's exclusive domain).
    pub async fn new(session: CdpSession) -> Result<Arc<Self>> {
        session
            .execute_raw("Debugger.enable", serde_json::json!({}))
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to enable Debugger domain: {e}")))?;

        let catalog = Arc::new(Self {
            session: session.clone(),
            inner: RwLock::new(Inner {
                scripts: HashMap::new(),
                by_url: HashMap::new(),
                chunks: HashMap::new(),
                keyword_index: HashMap::new(),
            }),
        });

        let task_catalog = catalog.clone();
        let page = session.page().clone();
        tokio::spawn(async move {
            let stream = page
                .event_listener::<cdp_debugger::EventScriptParsed>()
                .await;
            let mut stream = match stream {
                Ok(s) => s,
                Err(err) => {
                    warn!("failed to subscribe to Debugger.scriptParsed: {err}");
                    return;
                }
            };
            while let Some(event) = stream.next().await {
                task_catalog.on_script_parsed(&event).await;
            }
        });

        Ok(catalog)
    }

    async fn on_script_parsed(&self, event: &cdp_debugger::EventScriptParsed) {
        let script = ParsedScript {
            script_id: event.script_id.inner().clone(),
            url: event.url.clone(),
            start_line: event.start_line,
            start_column: event.start_column,
            end_line: event.end_line,
            end_column: event.end_column,
            source_length: event.length.unwrap_or(0) as usize,
            source: None,
        };
        let mut inner = self.inner.write().await;
        inner
            .by_url
            .entry(script.url.clone())
            .or_default()
            .push(script.script_id.clone());
        inner.scripts.insert(script.script_id.clone(), script);
    }

    /// Resolves `scriptId` directly, or the newest script matching a URL
    /// glob (a plain substring/`*`-wildcard match), fetching and indexing
    /// its source if not already present.
    pub async fn get_script_source(&self, script_id_or_url: &str) -> Result<ParsedScript> {
        let resolved_id = {
            let inner = self.inner.read().await;
            if inner.scripts.contains_key(script_id_or_url) {
                script_id_or_url.to_string()
            } else {
                self.resolve_url_glob(&inner, script_id_or_url)?
            }
        };

        {
            let inner = self.inner.read().await;
            if let Some(script) = inner.scripts.get(&resolved_id) {
                if script.source.is_some() {
                    return Ok(script.clone());
                }
            }
        }

        self.fetch_and_index(&resolved_id).await
    }

    fn resolve_url_glob(&self, inner: &Inner, glob: &str) -> Result<String> {
        let pattern = glob.replace('.', "\\.").replace('*', ".*");
        let re = regex::Regex::new(&format!("^{pattern}$"))
            .map_err(|e| ServerError::InvalidArgument(format!("invalid url glob: {e}")))?;
        inner
            .scripts
            .values()
            .filter(|s| re.is_match(&s.url) || s.url.contains(glob))
            .max_by_key(|s| s.script_id.clone())
            .map(|s| s.script_id.clone())
            .ok_or_else(|| ServerError::NotFound(format!("no script matching `{glob}`")))
    }

    async fn fetch_and_index(&self, script_id: &str) -> Result<ParsedScript> {
        let params = serde_json::json!({ "scriptId": script_id });
        let response = self
            .session
            .execute_raw("Debugger.getScriptSource", params)
            .await?;
        let source = response
            .get("scriptSource")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServerError::Cdp("Debugger.getScriptSource returned no source".into()))?
            .to_string();

        let mut inner = self.inner.write().await;
        let script = inner
            .scripts
            .get_mut(script_id)
            .ok_or_else(|| ServerError::NotFound(format!("script `{script_id}` not found")))?;
        script.source = Some(source.clone());
        script.source_length = source.len();
        let url = script.url.clone();
        let updated = script.clone();

        let chunks = chunk::chunk_script(script_id, &source);
        inner.chunks.insert(script_id.to_string(), chunks);

        let entries = index::build_keyword_index(script_id, &url, &source);
        for entry in entries {
            inner
                .keyword_index
                .entry(entry.token.clone())
                .or_default()
                .push(entry);
        }

        debug!("indexed script {script_id} ({} bytes)", updated.source_length);
        Ok(updated)
    }

    pub async fn search(
        &self,
        keyword: &str,
        opts: search::SearchOptions,
    ) -> Result<Vec<search::SearchMatch>> {
        let inner = self.inner.read().await;
        search::search_in_scripts(&inner.scripts, &inner.keyword_index, keyword, opts)
    }

    pub async fn extract_function_tree(
        &self,
        script_id_or_url: &str,
        function_name: &str,
        opts: function_tree::ExtractOptions,
    ) -> Result<function_tree::FunctionTree> {
        let script = self.get_script_source(script_id_or_url).await?;
        let source = script
            .source
            .ok_or_else(|| ServerError::Internal("script source missing after fetch".into()))?;
        function_tree::extract_function_tree(&source, function_name, opts)
    }

    pub async fn get_chunks(&self, script_id: &str) -> Result<Vec<ScriptChunk>> {
        let inner = self.inner.read().await;
        inner
            .chunks
            .get(script_id)
            .cloned()
            .ok_or_else(|| ServerError::NotFound(format!("no chunks for script `{script_id}`")))
    }

    pub async fn list_scripts(&self) -> Vec<ParsedScript> {
        let inner = self.inner.read().await;
        let mut scripts: Vec<ParsedScript> = inner.scripts.values().cloned().collect();
        scripts.sort_by(|a, b| a.script_id.cmp(&b.script_id));
        scripts
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.scripts.clear();
        inner.by_url.clear();
        inner.chunks.clear();
        inner.keyword_index.clear();
    }

    pub async fn stats(&self) -> CatalogStats {
        let inner = self.inner.read().await;
        CatalogStats {
            script_count: inner.scripts.len(),
            scripts_with_source: inner.scripts.values().filter(|s| s.source.is_some()).count(),
            total_chunks: inner.chunks.values().map(Vec::len).sum(),
            index_keys: inner.keyword_index.len(),
        }
    }
}

#[async_trait]
impl CacheInstance for ScriptCatalog {
    fn name(&self) -> &'static str {
        "script_catalog"
    }

    async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let bytes: usize = inner
            .scripts
            .values()
            .map(|s| s.source.as_ref().map(String::len).unwrap_or(0))
            .sum();
        CacheStats {
            entries: inner.scripts.len(),
            bytes,
            hits: 0,
            misses: 0,
        }
    }

    async fn clear(&self) {
        ScriptCatalog::clear(self).await;
    }
}
