//! WatchExpressionManager (spec §4.I): an ordered list of named
//! expressions, evaluated against the paused call frame when available,
//! else the page's global context.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::browser::CdpSession;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct WatchResult {
    pub name: String,
    pub expression: String,
    pub success: bool,
    pub value: Option<Value>,
    pub error: Option<String>,
}

pub struct WatchExpressionManager {
    session: CdpSession,
    expressions: RwLock<Vec<(String, String)>>,
}

impl WatchExpressionManager {
    pub fn new(session: CdpSession) -> Self {
        Self {
            session,
            expressions: RwLock::new(Vec::new()),
        }
    }

    pub async fn add(&self, name: &str, expression: &str) {
        self.expressions
            .write()
            .await
            .push((name.to_string(), expression.to_string()));
    }

    pub async fn remove(&self, name: &str) {
        self.expressions.write().await.retain(|(n, _)| n != name);
    }

    pub async fn list(&self) -> Vec<(String, String)> {
        self.expressions.read().await.clone()
    }

    /// Evaluates every registered expression via the given call frame if
    /// `call_frame_id` is `Some` (the paused context), else the page global.
    pub async fn evaluate_all(&self, call_frame_id: Option<&str>) -> Vec<WatchResult> {
        let expressions = self.expressions.read().await.clone();
        let mut results = Vec::with_capacity(expressions.len());
        for (name, expression) in expressions {
            let outcome = self.evaluate_one(&expression, call_frame_id).await;
            results.push(match outcome {
                Ok(value) => WatchResult {
                    name,
                    expression,
                    success: true,
                    value: Some(value),
                    error: None,
                },
                Err(err) => WatchResult {
                    name,
                    expression,
                    success: false,
                    value: None,
                    error: Some(err.to_string()),
                },
            });
        }
        results
    }

    async fn evaluate_one(&self, expression: &str, call_frame_id: Option<&str>) -> Result<Value> {
        let (method, params) = match call_frame_id {
            Some(id) => (
                "Debugger.evaluateOnCallFrame",
                serde_json::json!({ "callFrameId": id, "expression": expression, "returnByValue": true }),
            ),
            None => (
                "Runtime.evaluate",
                serde_json::json!({ "expression": expression, "returnByValue": true }),
            ),
        };
        let response = self.session.execute_raw(method, params).await?;
        Ok(response
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }
}
