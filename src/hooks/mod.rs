//! Hook Engine (spec §4.J): turns a `HookOptions` into an injectable JS
//! string, authored as resource-loaded template assets parameterized by a
//! typed spec rather than ad-hoc string concatenation. The engine never
//! evaluates the script itself; injection is delegated to the caller.

mod templates;

use indexmap::IndexMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, ServerError};

pub const MAX_HOOK_RECORDS: usize = 1000;
pub const MAX_TOTAL_RECORDS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    Function,
    Xhr,
    Fetch,
    Websocket,
    Localstorage,
    Cookie,
    Eval,
    ObjectMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookAction {
    Log,
    Block,
    Modify,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookCondition {
    #[serde(default)]
    pub max_calls: Option<u64>,
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HookOptions {
    pub target: String,
    #[serde(rename = "type")]
    pub hook_type: HookType,
    pub action: HookAction,
    #[serde(default)]
    pub custom_code: Option<String>,
    #[serde(default)]
    pub condition: Option<HookCondition>,
    #[serde(default)]
    pub performance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionMethod {
    PageEvaluate,
    PageEvaluateOnNewDocument,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedHook {
    pub hook_id: String,
    pub script: String,
    pub instructions: String,
    pub injection_method: InjectionMethod,
}

pub struct HookEngine;

impl HookEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, options: HookOptions) -> Result<GeneratedHook> {
        let hook_id = Uuid::new_v4().to_string();
        let condition = options.condition.clone().unwrap_or_default();
        let script = templates::render(
            options.hook_type,
            &templates::RenderParams {
                hook_id: &hook_id,
                target: &options.target,
                action: options.action,
                custom_code: options.custom_code.as_deref().unwrap_or(""),
                max_calls: condition.max_calls.unwrap_or(u64::MAX),
                min_interval_ms: condition.min_interval_ms.unwrap_or(0),
                performance: options.performance,
            },
        )?;

        // Document-level interceptors (xhr/fetch/websocket/eval/localstorage/
        // cookie) must run before the page's own scripts; per-call targets
        // (function/object-method references on an already-loaded page) are
        // fine with an ordinary evaluate.
        let injection_method = match options.hook_type {
            HookType::Xhr
            | HookType::Fetch
            | HookType::Websocket
            | HookType::Eval
            | HookType::Localstorage
            | HookType::Cookie => InjectionMethod::PageEvaluateOnNewDocument,
            HookType::Function | HookType::ObjectMethod => InjectionMethod::PageEvaluate,
        };

        let instructions = match injection_method {
            InjectionMethod::PageEvaluateOnNewDocument => {
                "Inject via Page.addScriptToEvaluateOnNewDocument (or page.evaluateOnNewDocument) \
                 before navigation so the interceptor is in place before page scripts run."
                    .to_string()
            }
            InjectionMethod::PageEvaluate => {
                "Inject via Runtime.evaluate (or page.evaluate) against the already-loaded page."
                    .to_string()
            }
        };

        Ok(GeneratedHook {
            hook_id,
            script,
            instructions,
            injection_method,
        })
    }

    pub fn anti_debug_bypass(&self) -> GeneratedHook {
        GeneratedHook {
            hook_id: "anti-debug-bypass".to_string(),
            script: templates::ANTI_DEBUG_BYPASS.to_string(),
            instructions:
                "Inject via Page.addScriptToEvaluateOnNewDocument before navigation.".to_string(),
            injection_method: InjectionMethod::PageEvaluateOnNewDocument,
        }
    }
}

impl Default for HookEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-side accumulator for `window.__aiHooks[hookId]` records pulled
/// back from the page through a separate tool call. Backed by an
/// `IndexMap` rather than a `HashMap` so hook insertion order — needed to
/// find "the oldest hook" on global overflow — is tracked for free instead
/// of a separate timestamp field.
pub struct HookRecordStore {
    records: RwLock<IndexMap<String, Vec<Value>>>,
}

impl HookRecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(IndexMap::new()),
        }
    }

    pub async fn ingest(&self, hook_id: &str, new_records: Vec<Value>) {
        let mut records = self.records.write().await;
        let entry = records.entry(hook_id.to_string()).or_default();
        entry.extend(new_records);
        if entry.len() > MAX_HOOK_RECORDS {
            let drop_count = entry.len() - MAX_HOOK_RECORDS;
            entry.drain(0..drop_count);
        }

        let total: usize = records.values().map(Vec::len).sum();
        if total > MAX_TOTAL_RECORDS {
            if let Some((_, oldest)) = records.iter_mut().find(|(_, v)| !v.is_empty()) {
                let drop_count = oldest.len() / 2;
                oldest.drain(0..drop_count);
            }
        }
    }

    pub async fn get(&self, hook_id: &str) -> Vec<Value> {
        self.records
            .read()
            .await
            .get(hook_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn clear(&self, hook_id: &str) {
        self.records.write().await.shift_remove(hook_id);
    }

    pub async fn clear_all(&self) {
        self.records.write().await.clear();
    }
}

impl Default for HookRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_rejects_unresolvable_target_gracefully() {
        let engine = HookEngine::new();
        let result = engine.generate(HookOptions {
            target: "window.XMLHttpRequest".to_string(),
            hook_type: HookType::Xhr,
            action: HookAction::Log,
            custom_code: None,
            condition: None,
            performance: false,
        });
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn ingest_caps_per_hook_records() {
        let store = HookRecordStore::new();
        for i in 0..(MAX_HOOK_RECORDS + 50) {
            store.ingest("h1", vec![serde_json::json!({ "i": i })]).await;
        }
        assert_eq!(store.get("h1").await.len(), MAX_HOOK_RECORDS);
    }

    #[tokio::test]
    async fn ingest_drops_oldest_half_of_the_oldest_hook_on_global_overflow() {
        let store = HookRecordStore::new();
        let batch = |offset: usize| -> Vec<Value> {
            (0..1000).map(|i| serde_json::json!({ "i": i + offset })).collect()
        };

        // Ten hooks at exactly the per-hook cap sit right at the global cap;
        // "a" was ingested first, so it's the oldest hook once present.
        for (idx, hook) in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"].iter().enumerate() {
            store.ingest(hook, batch(idx * 1000)).await;
        }

        // One more hook pushes the global total over the cap.
        store.ingest("k", batch(10_000)).await;

        let a_len = store.get("a").await.len();
        let b_len = store.get("b").await.len();
        assert!(a_len < MAX_HOOK_RECORDS, "oldest hook should have been trimmed");
        assert_eq!(b_len, MAX_HOOK_RECORDS, "second-oldest hook should be untouched");
    }
}
