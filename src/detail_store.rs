//! Detail-ID Store (spec §4.C): caches oversized tool responses behind a
//! short-lived opaque handle.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Result, ServerError};

pub const DEFAULT_THRESHOLD_BYTES: usize = 50 * 1024;
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
pub const MAX_TTL: Duration = Duration::from_secs(60 * 60);
pub const MAX_ENTRIES: usize = 100;
const EXTEND_ON_ACCESS: Duration = Duration::from_secs(15 * 60);
const EXTEND_THRESHOLD: Duration = Duration::from_secs(5 * 60);

struct DetailEntry {
    data: Value,
    size: usize,
    created_at: Instant,
    last_accessed_at: Instant,
    access_count: u64,
    expires_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailSummary {
    #[serde(rename = "type")]
    pub value_type: &'static str,
    pub size_bytes: usize,
    pub size_kb: f64,
    pub preview: String,
    pub top_level_keys: Option<Vec<String>>,
    pub array_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmartHandle {
    pub summary: DetailSummary,
    #[serde(rename = "detailId")]
    pub detail_id: String,
    pub hint: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

pub enum SmartHandleResult {
    Inline(Value),
    Handle(SmartHandle),
}

pub struct DetailStore {
    entries: Mutex<IndexMap<String, DetailEntry>>,
}

impl Default for DetailStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    fn summarize(data: &Value, size: usize) -> DetailSummary {
        let preview_full = data.to_string();
        let preview: String = preview_full.chars().take(200).collect();
        let (value_type, top_level_keys, array_length) = match data {
            Value::Object(map) => (
                "object",
                Some(map.keys().take(50).cloned().collect()),
                None,
            ),
            Value::Array(items) => ("array", None, Some(items.len())),
            Value::String(_) => ("string", None, None),
            Value::Number(_) => ("number", None, None),
            Value::Bool(_) => ("boolean", None, None),
            Value::Null => ("null", None, None),
        };
        DetailSummary {
            value_type,
            size_bytes: size,
            size_kb: size as f64 / 1024.0,
            preview,
            top_level_keys,
            array_length,
        }
    }

    /// `smartHandle`: returns the value verbatim when small enough, else an
    /// opaque handle plus summary.
    pub async fn smart_handle(&self, data: Value, threshold: usize) -> Result<SmartHandleResult> {
        let size = data.to_string().len();
        if size <= threshold {
            return Ok(SmartHandleResult::Inline(data));
        }

        let summary = Self::summarize(&data, size);
        let now = Instant::now();
        let detail_id = Uuid::new_v4().to_string();
        let expires_at = now + DEFAULT_TTL;

        let mut guard = self.entries.lock().await;
        if guard.len() >= MAX_ENTRIES {
            self.evict_lru(&mut guard);
        }
        guard.insert(
            detail_id.clone(),
            DetailEntry {
                data,
                size,
                created_at: now,
                last_accessed_at: now,
                access_count: 0,
                expires_at,
            },
        );

        let expires_at_utc = chrono::Utc::now()
            + chrono::Duration::from_std(DEFAULT_TTL).unwrap_or(chrono::Duration::zero());
        Ok(SmartHandleResult::Handle(SmartHandle {
            summary,
            detail_id,
            hint: "Use get_detailed_data with this detailId (and an optional dot-separated path) \
                   to retrieve the full payload or a sub-value."
                .to_string(),
            expires_at: expires_at_utc,
        }))
    }

    fn evict_lru(&self, guard: &mut IndexMap<String, DetailEntry>) {
        if let Some((lru_key, _)) = guard
            .iter()
            .min_by_key(|(_, e)| e.last_accessed_at)
            .map(|(k, e)| (k.clone(), e.last_accessed_at))
        {
            guard.shift_remove(&lru_key);
        }
    }

    /// Walks `path` (dot-separated keys) into the stored value, extending
    /// the TTL when fewer than 5 minutes remain, capped by `MAX_TTL` from
    /// creation — the stricter of the two bounds discussed in the open
    /// question about auto-extension, per spec's explicit resolution.
    pub async fn retrieve(&self, detail_id: &str, path: Option<&str>) -> Result<Value> {
        let mut guard = self.entries.lock().await;
        let entry = guard
            .get_mut(detail_id)
            .ok_or_else(|| ServerError::NotFound(format!("detail id `{detail_id}` not found")))?;

        let now = Instant::now();
        if now >= entry.expires_at {
            guard.shift_remove(detail_id);
            return Err(ServerError::NotFound(format!(
                "detail id `{detail_id}` not found (expired)"
            )));
        }

        entry.last_accessed_at = now;
        entry.access_count += 1;
        if entry.expires_at - now < EXTEND_THRESHOLD {
            let max_expiry = entry.created_at + MAX_TTL;
            entry.expires_at = std::cmp::min(now + EXTEND_ON_ACCESS, max_expiry);
        }

        let value = entry.data.clone();
        drop(guard);

        match path {
            None => Ok(value),
            Some(path) => Self::walk_path(&value, path),
        }
    }

    fn walk_path(value: &Value, path: &str) -> Result<Value> {
        let mut current = value;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = current.get(segment).ok_or_else(|| {
                ServerError::NotFound(format!("path segment `{segment}` not found in detail value"))
            })?;
        }
        Ok(current.clone())
    }

    /// Sweeps entries whose TTL has elapsed; called periodically and from
    /// `clear`.
    pub async fn sweep_expired(&self) {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        guard.retain(|_, e| e.expires_at > now);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn stats(&self) -> (usize, usize) {
        let guard = self.entries.lock().await;
        let bytes: usize = guard.values().map(|e| e.size).sum();
        (guard.len(), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn small_payload_returns_inline() {
        let store = DetailStore::new();
        let data = serde_json::json!({"a": 1});
        match store.smart_handle(data.clone(), DEFAULT_THRESHOLD_BYTES).await.unwrap() {
            SmartHandleResult::Inline(v) => assert_eq!(v, data),
            SmartHandleResult::Handle(_) => panic!("expected inline"),
        }
    }

    #[tokio::test]
    async fn oversized_payload_round_trips_through_retrieve() {
        let store = DetailStore::new();
        let big = serde_json::json!({"payload": "x".repeat(100)});
        let handle = match store.smart_handle(big.clone(), 10).await.unwrap() {
            SmartHandleResult::Handle(h) => h,
            SmartHandleResult::Inline(_) => panic!("expected handle"),
        };
        let retrieved = store.retrieve(&handle.detail_id, None).await.unwrap();
        assert_eq!(retrieved, big);
    }

    #[tokio::test]
    async fn retrieve_supports_dot_path() {
        let store = DetailStore::new();
        let big = serde_json::json!({"nested": {"value": "x".repeat(100)}});
        let handle = match store.smart_handle(big, 10).await.unwrap() {
            SmartHandleResult::Handle(h) => h,
            SmartHandleResult::Inline(_) => panic!("expected handle"),
        };
        let v = store
            .retrieve(&handle.detail_id, Some("nested.value"))
            .await
            .unwrap();
        assert_eq!(v.as_str().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = DetailStore::new();
        let err = store.retrieve("nonexistent", None).await.unwrap_err();
        assert_eq!(err.category(), "not_found");
    }
}
