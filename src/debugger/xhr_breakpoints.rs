//! XHRBreakpointManager (spec §4.I): `DOMDebugger.setXHRBreakpoint` /
//! `removeXHRBreakpoint`, with a small registry tracking hit counts.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::browser::CdpSession;
use crate::error::{Result, ServerError};

#[derive(Debug, Clone, Serialize)]
pub struct XhrBreakpoint {
    pub id: String,
    pub url_pattern: String,
    pub hit_count: u64,
}

pub struct XhrBreakpointManager {
    session: CdpSession,
    registry: RwLock<HashMap<String, XhrBreakpoint>>,
}

impl XhrBreakpointManager {
    pub fn new(session: CdpSession) -> Self {
        Self {
            session,
            registry: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, url_pattern: &str) -> Result<XhrBreakpoint> {
        let params = serde_json::json!({ "url": url_pattern });
        self.session
            .execute_raw("DOMDebugger.setXHRBreakpoint", params)
            .await?;

        let id = Uuid::new_v4().to_string();
        let bp = XhrBreakpoint {
            id: id.clone(),
            url_pattern: url_pattern.to_string(),
            hit_count: 0,
        };
        self.registry.write().await.insert(id, bp.clone());
        Ok(bp)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let url_pattern = {
            let registry = self.registry.read().await;
            registry
                .get(id)
                .map(|b| b.url_pattern.clone())
                .ok_or_else(|| ServerError::NotFound(format!("xhr breakpoint `{id}` not found")))?
        };
        let params = serde_json::json!({ "url": url_pattern });
        self.session
            .execute_raw("DOMDebugger.removeXHRBreakpoint", params)
            .await?;
        self.registry.write().await.remove(id);
        Ok(())
    }

    pub async fn list(&self) -> Vec<XhrBreakpoint> {
        self.registry.read().await.values().cloned().collect()
    }

    /// Called by the Debugger Core's pause handler when a paused event's
    /// reason indicates an XHR breakpoint hit, keyed by matching URL.
    pub async fn record_hit(&self, url: &str) {
        let mut registry = self.registry.write().await;
        for bp in registry.values_mut() {
            if url.contains(&bp.url_pattern) {
                bp.hit_count += 1;
            }
        }
    }
}
