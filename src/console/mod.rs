//! Console / Exception Monitor (spec §4.H): owns `Runtime` and `Console`,
//! normalizes events into bounded ring buffers, and offers page-side
//! injectors for dynamic-script/XHR/fetch/function/property observation.

mod injectors;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use chromiumoxide::cdp::js_protocol::console as cdp_console;
use chromiumoxide::cdp::js_protocol::runtime as cdp_runtime;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use crate::browser::CdpSession;
use crate::error::{Result, ServerError};

pub const MAX_MESSAGES: usize = 1000;
pub const MAX_EXCEPTIONS: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleMessage {
    pub message_type: String,
    pub text: String,
    pub url: Option<String>,
    pub timestamp: f64,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionInfo {
    pub text: String,
    pub url: Option<String>,
    pub line: i64,
    pub column: i64,
    pub stack: Option<String>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleFilter {
    pub message_type: Option<String>,
    pub url: Option<String>,
    pub since: Option<f64>,
    pub limit: Option<usize>,
}

struct Buffers {
    messages: VecDeque<ConsoleMessage>,
    exceptions: VecDeque<ExceptionInfo>,
}

impl Buffers {
    fn push_message(&mut self, msg: ConsoleMessage) {
        self.messages.push_back(msg);
        if self.messages.len() > MAX_MESSAGES {
            retain_newer_half(&mut self.messages);
        }
    }

    fn push_exception(&mut self, exc: ExceptionInfo) {
        self.exceptions.push_back(exc);
        if self.exceptions.len() > MAX_EXCEPTIONS {
            retain_newer_half(&mut self.exceptions);
        }
    }
}

fn retain_newer_half<T>(buf: &mut VecDeque<T>) {
    let drop_count = buf.len() / 2;
    for _ in 0..drop_count {
        buf.pop_front();
    }
}

pub struct ConsoleMonitor {
    session: CdpSession,
    enabled: AtomicBool,
    buffers: RwLock<Buffers>,
}

impl ConsoleMonitor {
    pub fn new(session: CdpSession) -> Self {
        Self {
            session,
            enabled: AtomicBool::new(false),
            buffers: RwLock::new(Buffers {
                messages: VecDeque::new(),
                exceptions: VecDeque::new(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enables `Runtime`/`Console` and subscribes to their events. Safe to
    /// call more than once; subsequent calls are no-ops, matching the
    /// idempotent co-enable contract the Network Recorder relies on.
    pub async fn ensure_enabled(self: &std::sync::Arc<Self>) -> Result<()> {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.session
            .execute_raw("Runtime.enable", serde_json::json!({}))
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to enable Runtime domain: {e}")))?;
        self.session
            .execute_raw("Console.enable", serde_json::json!({}))
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to enable Console domain: {e}")))?;

        self.spawn_console_api_listener();
        self.spawn_exception_listener();
        self.spawn_message_added_listener();

        Ok(())
    }

    fn spawn_console_api_listener(self: &std::sync::Arc<Self>) {
        let this = self.clone();
        let page = self.session.page().clone();
        tokio::spawn(async move {
            let Ok(mut stream) = page
                .event_listener::<cdp_runtime::EventConsoleApiCalled>()
                .await
            else {
                warn!("failed to subscribe to Runtime.consoleAPICalled");
                return;
            };
            while let Some(event) = stream.next().await {
                let args: Vec<Value> = event
                    .args
                    .iter()
                    .filter_map(|a| a.value.clone())
                    .collect();
                let msg = ConsoleMessage {
                    message_type: format!("{:?}", event.r#type),
                    text: args
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(" "),
                    url: event
                        .stack_trace
                        .as_ref()
                        .and_then(|st| st.call_frames.first())
                        .map(|f| f.url.clone()),
                    timestamp: event.timestamp.inner(),
                    args,
                };
                this.buffers.write().await.push_message(msg);
            }
        });
    }

    fn spawn_exception_listener(self: &std::sync::Arc<Self>) {
        let this = self.clone();
        let page = self.session.page().clone();
        tokio::spawn(async move {
            let Ok(mut stream) = page
                .event_listener::<cdp_runtime::EventExceptionThrown>()
                .await
            else {
                warn!("failed to subscribe to Runtime.exceptionThrown");
                return;
            };
            while let Some(event) = stream.next().await {
                let details = &event.exception_details;
                let exc = ExceptionInfo {
                    text: details.text.clone(),
                    url: details.url.clone(),
                    line: details.line_number,
                    column: details.column_number,
                    stack: details.stack_trace.as_ref().map(|st| format!("{st:?}")),
                    timestamp: event.timestamp.inner(),
                };
                this.buffers.write().await.push_exception(exc);
            }
        });
    }

    fn spawn_message_added_listener(self: &std::sync::Arc<Self>) {
        let this = self.clone();
        let page = self.session.page().clone();
        tokio::spawn(async move {
            let Ok(mut stream) = page
                .event_listener::<cdp_console::EventMessageAdded>()
                .await
            else {
                warn!("failed to subscribe to Console.messageAdded");
                return;
            };
            while let Some(event) = stream.next().await {
                let entry = &event.message;
                let msg = ConsoleMessage {
                    message_type: format!("{:?}", entry.level),
                    text: entry.text.clone(),
                    url: Some(entry.url.clone()),
                    timestamp: 0.0,
                    args: Vec::new(),
                };
                this.buffers.write().await.push_message(msg);
            }
        });
    }

    pub async fn messages(&self, filter: ConsoleFilter) -> Vec<ConsoleMessage> {
        let buffers = self.buffers.read().await;
        apply_filter(buffers.messages.iter().cloned(), &filter, |m| {
            (&m.message_type, &m.url, m.timestamp)
        })
    }

    pub async fn exceptions(&self, filter: ConsoleFilter) -> Vec<ExceptionInfo> {
        let buffers = self.buffers.read().await;
        apply_filter(buffers.exceptions.iter().cloned(), &filter, |e| {
            (&"exception".to_string(), &e.url, e.timestamp)
        })
    }

    /// Issues `Runtime.evaluate` for a value-returning expression against
    /// the page global, surfacing thrown exceptions as an error.
    pub async fn execute(&self, expression: &str) -> Result<Value> {
        let params = serde_json::json!({
            "expression": expression,
            "returnByValue": true,
            "awaitPromise": true,
        });
        let response = self
            .session
            .execute_raw("Runtime.evaluate", params)
            .await?;
        if let Some(exception) = response.get("exceptionDetails") {
            let text = exception
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("evaluation threw")
                .to_string();
            return Err(ServerError::Cdp(text));
        }
        Ok(response
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Posts one of the named in-page injector scripts through
    /// `Runtime.evaluate`. Each script is idempotent via a
    /// `window.__<name>Installed` guard baked into the asset itself.
    pub async fn inject(&self, name: &str, args: &[&str]) -> Result<Value> {
        let script = injectors::render(name, args)?;
        self.execute(&script).await
    }
}

fn apply_filter<T, F>(
    iter: impl Iterator<Item = T>,
    filter: &ConsoleFilter,
    project: F,
) -> Vec<T>
where
    F: Fn(&T) -> (&String, &Option<String>, f64),
{
    let mut out: Vec<T> = iter
        .filter(|item| {
            let (msg_type, url, ts) = project(item);
            if let Some(want_type) = &filter.message_type {
                if msg_type != want_type {
                    return false;
                }
            }
            if let Some(want_url) = &filter.url {
                match url {
                    Some(u) if u.contains(want_url.as_str()) => {}
                    _ => return false,
                }
            }
            if let Some(since) = filter.since {
                if ts < since {
                    return false;
                }
            }
            true
        })
        .collect();

    if let Some(limit) = filter.limit {
        out.truncate(limit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_newer_half_drops_oldest() {
        let mut buf: VecDeque<i32> = (0..10).collect();
        retain_newer_half(&mut buf);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.front(), Some(&5));
    }

    #[test]
    fn filter_by_type_and_limit() {
        let messages = vec![
            ConsoleMessage {
                message_type: "log".into(),
                text: "a".into(),
                url: None,
                timestamp: 1.0,
                args: vec![],
            },
            ConsoleMessage {
                message_type: "error".into(),
                text: "b".into(),
                url: None,
                timestamp: 2.0,
                args: vec![],
            },
        ];
        let filter = ConsoleFilter {
            message_type: Some("error".into()),
            ..Default::default()
        };
        let out = apply_filter(messages.into_iter(), &filter, |m| {
            (&m.message_type, &m.url, m.timestamp)
        });
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "b");
    }
}
