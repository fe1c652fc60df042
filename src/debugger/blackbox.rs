//! BlackboxManager (spec §4.I): a set of URL glob patterns pushed to
//! `Debugger.setBlackboxPatterns` in full on every change.

use std::collections::BTreeSet;

use tokio::sync::RwLock;

use crate::browser::CdpSession;
use crate::error::Result;

/// Preset "common library" bundle: third-party code rarely worth
/// stepping into while reverse-engineering a page's own script.
pub const COMMON_LIBRARY_BUNDLE: &[&str] = &[
    "jquery",
    "react",
    "vue",
    "angular",
    "lodash",
    "moment",
    "axios",
    "node_modules",
    "webpack",
    "bundles",
    "vendor",
];

pub struct BlackboxManager {
    session: CdpSession,
    patterns: RwLock<BTreeSet<String>>,
}

impl BlackboxManager {
    pub fn new(session: CdpSession) -> Self {
        Self {
            session,
            patterns: RwLock::new(BTreeSet::new()),
        }
    }

    pub async fn add(&self, pattern: &str) -> Result<()> {
        self.patterns.write().await.insert(pattern.to_string());
        self.push().await
    }

    pub async fn remove(&self, pattern: &str) -> Result<()> {
        self.patterns.write().await.remove(pattern);
        self.push().await
    }

    pub async fn apply_common_library_bundle(&self) -> Result<()> {
        {
            let mut patterns = self.patterns.write().await;
            for pattern in COMMON_LIBRARY_BUNDLE {
                patterns.insert((*pattern).to_string());
            }
        }
        self.push().await
    }

    pub async fn patterns(&self) -> Vec<String> {
        self.patterns.read().await.iter().cloned().collect()
    }

    async fn push(&self) -> Result<()> {
        let patterns: Vec<String> = self.patterns.read().await.iter().cloned().collect();
        let params = serde_json::json!({ "patterns": patterns });
        self.session
            .execute_raw("Debugger.setBlackboxPatterns", params)
            .await?;
        Ok(())
    }
}
