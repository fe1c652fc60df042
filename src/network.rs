//! Network Recorder (spec §4.G): owns `Network`, co-enables the Console
//! monitor on first use, and keeps two bounded insertion-ordered maps of
//! requests/responses with front eviction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::network as cdp_network;
use futures::StreamExt;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::browser::CdpSession;
use crate::console::ConsoleMonitor;
use crate::error::{Result, ServerError};

pub const MAX_NETWORK_RECORDS: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct NetworkRequest {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub headers: serde_json::Map<String, Value>,
    pub post_data: Option<String>,
    pub timestamp: f64,
    pub resource_type: Option<String>,
    pub initiator: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkResponse {
    pub request_id: String,
    pub url: String,
    pub status: i64,
    pub status_text: String,
    pub headers: serde_json::Map<String, Value>,
    pub mime_type: String,
    pub timestamp: f64,
    pub from_cache: bool,
    pub timing: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseBody {
    pub body: String,
    pub base64_encoded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JavaScriptResponse {
    pub request_id: String,
    pub url: String,
    pub mime_type: String,
    pub body: String,
}

struct Store {
    requests: IndexMap<String, NetworkRequest>,
    responses: IndexMap<String, NetworkResponse>,
    finished: std::collections::HashSet<String>,
}

fn evict_if_over_cap<K: std::hash::Hash + Eq + Clone, V>(map: &mut IndexMap<K, V>) {
    while map.len() > MAX_NETWORK_RECORDS {
        map.shift_remove_index(0);
    }
}

pub struct NetworkRecorder {
    session: CdpSession,
    console: Arc<ConsoleMonitor>,
    enabled: AtomicBool,
    store: RwLock<Store>,
    listeners: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl NetworkRecorder {
    pub fn new(session: CdpSession, console: Arc<ConsoleMonitor>) -> Self {
        Self {
            session,
            console,
            enabled: AtomicBool::new(false),
            store: RwLock::new(Store {
                requests: IndexMap::new(),
                responses: IndexMap::new(),
                finished: std::collections::HashSet::new(),
            }),
            listeners: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub async fn enable(self: &Arc<Self>) -> Result<()> {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.console.ensure_enabled().await?;

        self.session
            .execute_raw("Network.enable", serde_json::json!({}))
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to enable Network domain: {e}")))?;

        let handles = vec![
            self.spawn_request_listener(),
            self.spawn_response_listener(),
            self.spawn_loading_finished_listener(),
        ];
        *self.listeners.lock().await = handles;

        Ok(())
    }

    fn spawn_request_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        let page = self.session.page().clone();
        tokio::spawn(async move {
            let Ok(mut stream) = page
                .event_listener::<cdp_network::EventRequestWillBeSent>()
                .await
            else {
                warn!("failed to subscribe to Network.requestWillBeSent");
                return;
            };
            while let Some(event) = stream.next().await {
                if !this.enabled.load(Ordering::SeqCst) {
                    break;
                }
                let headers = event
                    .request
                    .headers
                    .inner()
                    .as_object()
                    .cloned()
                    .unwrap_or_default();
                let request = NetworkRequest {
                    request_id: event.request_id.inner().clone(),
                    url: event.request.url.clone(),
                    method: event.request.method.clone(),
                    headers,
                    post_data: event.request.post_data.clone(),
                    timestamp: event.timestamp.inner(),
                    resource_type: Some(format!("{:?}", event.r#type)),
                    initiator: serde_json::to_value(&event.initiator).ok(),
                };
                let mut store = this.store.write().await;
                store.requests.insert(request.request_id.clone(), request);
                evict_if_over_cap(&mut store.requests);
            }
        })
    }

    fn spawn_response_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        let page = self.session.page().clone();
        tokio::spawn(async move {
            let Ok(mut stream) = page
                .event_listener::<cdp_network::EventResponseReceived>()
                .await
            else {
                warn!("failed to subscribe to Network.responseReceived");
                return;
            };
            while let Some(event) = stream.next().await {
                if !this.enabled.load(Ordering::SeqCst) {
                    break;
                }
                let headers = event
                    .response
                    .headers
                    .inner()
                    .as_object()
                    .cloned()
                    .unwrap_or_default();
                let response = NetworkResponse {
                    request_id: event.request_id.inner().clone(),
                    url: event.response.url.clone(),
                    status: event.response.status,
                    status_text: event.response.status_text.clone(),
                    headers,
                    mime_type: event.response.mime_type.clone(),
                    timestamp: event.timestamp.inner(),
                    from_cache: event.response.from_disk_cache.unwrap_or(false)
                        || event.response.from_prefetch_cache.unwrap_or(false),
                    timing: serde_json::to_value(&event.response.timing).ok(),
                };
                let mut store = this.store.write().await;
                store.responses.insert(response.request_id.clone(), response);
                evict_if_over_cap(&mut store.responses);
            }
        })
    }

    fn spawn_loading_finished_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        let page = self.session.page().clone();
        tokio::spawn(async move {
            let Ok(mut stream) = page
                .event_listener::<cdp_network::EventLoadingFinished>()
                .await
            else {
                warn!("failed to subscribe to Network.loadingFinished");
                return;
            };
            while let Some(event) = stream.next().await {
                if !this.enabled.load(Ordering::SeqCst) {
                    break;
                }
                this.store
                    .write()
                    .await
                    .finished
                    .insert(event.request_id.inner().clone());
            }
        })
    }

    /// Returns `None` if monitoring is disabled, the request is unknown, or
    /// its response has not arrived yet. Must not be called before `enable`.
    pub async fn get_response_body(&self, request_id: &str) -> Result<Option<ResponseBody>> {
        if !self.is_enabled() {
            return Err(ServerError::PreconditionFailed(
                "Network monitoring not enabled".into(),
            ));
        }

        let ready = {
            let store = self.store.read().await;
            store.responses.contains_key(request_id) && store.finished.contains(request_id)
        };
        if !ready {
            return Ok(None);
        }

        let params = serde_json::json!({ "requestId": request_id });
        let response = self
            .session
            .execute_raw("Network.getResponseBody", params)
            .await?;
        let body = response
            .get("body")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let base64_encoded = response
            .get("base64Encoded")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(Some(ResponseBody { body, base64_encoded }))
    }

    /// Fetches the body of every response whose `mimeType` contains
    /// `javascript` or whose URL ends in `.js`/`.js?`. Idempotent: safe to
    /// call repeatedly, re-fetching bodies for responses seen since.
    pub async fn get_all_javascript_responses(&self) -> Result<Vec<JavaScriptResponse>> {
        if !self.is_enabled() {
            return Err(ServerError::PreconditionFailed(
                "Network monitoring not enabled".into(),
            ));
        }

        let candidates: Vec<NetworkResponse> = {
            let store = self.store.read().await;
            store
                .responses
                .values()
                .filter(|r| {
                    r.mime_type.contains("javascript")
                        || r.url.ends_with(".js")
                        || r.url.ends_with(".js?")
                })
                .cloned()
                .collect()
        };

        let mut out = Vec::with_capacity(candidates.len());
        for response in candidates {
            match self.get_response_body(&response.request_id).await {
                Ok(Some(body)) => {
                    let decoded = if body.base64_encoded {
                        base64::engine::general_purpose::STANDARD
                            .decode(&body.body)
                            .ok()
                            .and_then(|bytes| String::from_utf8(bytes).ok())
                            .unwrap_or(body.body)
                    } else {
                        body.body
                    };
                    out.push(JavaScriptResponse {
                        request_id: response.request_id,
                        url: response.url,
                        mime_type: response.mime_type,
                        body: decoded,
                    });
                }
                Ok(None) => continue,
                Err(err) => warn!("failed to fetch response body: {err}"),
            }
        }
        Ok(out)
    }

    pub async fn requests(&self) -> Vec<NetworkRequest> {
        self.store.read().await.requests.values().cloned().collect()
    }

    pub async fn responses(&self) -> Vec<NetworkResponse> {
        self.store.read().await.responses.values().cloned().collect()
    }

    /// Idempotent: removing an already-disabled recorder's listeners is a
    /// no-op beyond the `Network.disable` call. Aborts the three listener
    /// tasks spawned by `enable` so a later `enable` doesn't fan out events
    /// to both a stale and a fresh set of listeners.
    pub async fn disable(&self) -> Result<()> {
        if !self.enabled.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.session
            .execute_raw("Network.disable", serde_json::json!({}))
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to disable Network domain: {e}")))?;

        for handle in self.listeners.lock().await.drain(..) {
            handle.abort();
        }

        let mut store = self.store.write().await;
        store.requests.clear();
        store.responses.clear();
        store.finished.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_caps_map_at_limit() {
        let mut map: IndexMap<String, u32> = IndexMap::new();
        for i in 0..(MAX_NETWORK_RECORDS + 10) {
            map.insert(format!("id{i}"), i as u32);
            evict_if_over_cap(&mut map);
        }
        assert_eq!(map.len(), MAX_NETWORK_RECORDS);
        // Oldest entries (id0..id9) were evicted; newest survive.
        assert!(!map.contains_key("id0"));
        assert!(map.contains_key(&format!("id{}", MAX_NETWORK_RECORDS + 9)));
    }
}
