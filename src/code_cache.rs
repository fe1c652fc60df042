//! On-disk code-artifact cache (spec §6 "Persisted state" (b), §4.K
//! `collect_code`): one JSON file per collected URL, keyed by `md5(url)`,
//! with TTL expiry and a total-size cap enforced by oldest-first eviction
//! down to 80% of the cap. File layout and the `tokio::fs` read/write/
//! read_dir plumbing mirror the Debugger Core's session persistence in
//! `debugger::session_io`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheInstance, CacheStats};
use crate::error::Result;

pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;
const EVICT_TO_RATIO: f64 = 0.80;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFile {
    pub url: String,
    pub content: String,
}

/// `{url, files, totalSize, collectTime, timestamp, hash}` per spec's
/// disk-cache schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub url: String,
    pub files: Vec<CodeFile>,
    pub total_size: usize,
    pub collect_time: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeArtifactSummary {
    pub url: String,
    pub file_count: usize,
    pub total_size: usize,
    pub collect_time: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub hash: String,
    pub file_urls: Vec<String>,
}

impl CodeArtifact {
    pub fn summarize(&self) -> CodeArtifactSummary {
        CodeArtifactSummary {
            url: self.url.clone(),
            file_count: self.files.len(),
            total_size: self.total_size,
            collect_time: self.collect_time,
            timestamp: self.timestamp,
            hash: self.hash.clone(),
            file_urls: self.files.iter().map(|f| f.url.clone()).collect(),
        }
    }
}

pub fn hash_url(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn hash_files(files: &[CodeFile]) -> String {
    let mut hasher = Md5::new();
    for file in files {
        hasher.update(file.url.as_bytes());
        hasher.update(file.content.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Disk-backed cache of `collect_code` artifacts, registered with the
/// Unified Cache Coordinator alongside the in-memory caches.
pub struct CodeCache {
    dir: PathBuf,
    ttl: Duration,
    max_size_bytes: u64,
    enabled: bool,
}

impl CodeCache {
    pub fn new(dir: PathBuf, ttl: Duration, max_size_bytes: u64, enabled: bool) -> Self {
        Self { dir, ttl, max_size_bytes, enabled }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_url(url)))
    }

    /// Returns `None` on a miss, a corrupt entry, or an expired one (the
    /// expired file is removed as a side effect).
    pub async fn get(&self, url: &str) -> Result<Option<CodeArtifact>> {
        if !self.enabled {
            return Ok(None);
        }
        let path = self.path_for(url);
        let Ok(contents) = tokio::fs::read_to_string(&path).await else {
            return Ok(None);
        };
        let Ok(artifact) = serde_json::from_str::<CodeArtifact>(&contents) else {
            return Ok(None);
        };

        let age = chrono::Utc::now().signed_duration_since(artifact.timestamp);
        let age = age.to_std().unwrap_or(Duration::MAX);
        if age > self.ttl {
            let _ = tokio::fs::remove_file(&path).await;
            return Ok(None);
        }
        Ok(Some(artifact))
    }

    pub async fn put(&self, artifact: &CodeArtifact) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&artifact.url);
        let json = serde_json::to_string(artifact)?;
        tokio::fs::write(&path, json).await?;
        self.enforce_cap().await?;
        Ok(())
    }

    /// Oldest-first eviction (by file mtime) down to `EVICT_TO_RATIO` of
    /// `max_size_bytes`, per spec's "oldest-first eviction to 80%".
    async fn enforce_cap(&self) -> Result<u64> {
        let mut entries = self.list_entries().await?;
        let mut total: u64 = entries.iter().map(|e| e.1).sum();
        if total <= self.max_size_bytes {
            return Ok(0);
        }

        entries.sort_by_key(|e| e.2);
        let target = (self.max_size_bytes as f64 * EVICT_TO_RATIO) as u64;
        let mut freed = 0u64;
        for (path, size, _modified) in entries {
            if total <= target {
                break;
            }
            if tokio::fs::remove_file(&path).await.is_ok() {
                total -= size;
                freed += size;
            }
        }
        Ok(freed)
    }

    async fn list_entries(&self) -> Result<Vec<(PathBuf, u64, std::time::SystemTime)>> {
        let mut out = Vec::new();
        let Ok(mut dir) = tokio::fs::read_dir(&self.dir).await else {
            return Ok(out);
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let metadata = entry.metadata().await?;
            out.push((path, metadata.len(), metadata.modified()?));
        }
        Ok(out)
    }
}

#[async_trait]
impl CacheInstance for CodeCache {
    fn name(&self) -> &'static str {
        "code_cache"
    }

    async fn stats(&self) -> CacheStats {
        let entries = self.list_entries().await.unwrap_or_default();
        CacheStats {
            entries: entries.len(),
            bytes: entries.iter().map(|e| e.1 as usize).sum(),
            hits: 0,
            misses: 0,
        }
    }

    async fn cleanup(&self) -> usize {
        self.enforce_cap().await.unwrap_or(0) as usize
    }

    async fn clear(&self) {
        if let Ok(entries) = self.list_entries().await {
            for (path, _, _) in entries {
                let _ = tokio::fs::remove_file(&path).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(url: &str, content_len: usize) -> CodeArtifact {
        let files = vec![CodeFile {
            url: format!("{url}/bundle.js"),
            content: "x".repeat(content_len),
        }];
        let hash = hash_files(&files);
        CodeArtifact {
            url: url.to_string(),
            total_size: content_len,
            collect_time: 5,
            timestamp: chrono::Utc::now(),
            hash,
            files,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CodeCache::new(dir.path().to_path_buf(), Duration::from_secs(3600), DEFAULT_MAX_SIZE_BYTES, true);
        let art = artifact("https://example.com/app.js", 100);
        cache.put(&art).await.unwrap();

        let loaded = cache.get("https://example.com/app.js").await.unwrap().unwrap();
        assert_eq!(loaded.hash, art.hash);
        assert_eq!(loaded.files.len(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CodeCache::new(dir.path().to_path_buf(), Duration::from_millis(1), DEFAULT_MAX_SIZE_BYTES, true);
        let mut art = artifact("https://example.com/app.js", 10);
        art.timestamp = chrono::Utc::now()
            - chrono::Duration::from_std(Duration::from_secs(10)).unwrap();
        cache.put(&art).await.unwrap();

        let hit = cache.get("https://example.com/app.js").await.unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn oldest_entries_are_evicted_once_over_cap() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CodeCache::new(dir.path().to_path_buf(), Duration::from_secs(3600), 1_000, true);

        for i in 0..5 {
            let art = artifact(&format!("https://example.com/{i}.js"), 300);
            cache.put(&art).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let stats = CacheInstance::stats(&cache).await;
        assert!(stats.bytes <= 1_000);
        // The earliest-written entries should be the ones gone.
        assert!(cache.get("https://example.com/0.js").await.unwrap().is_none());
    }
}
