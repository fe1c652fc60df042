//! Debugger Core (spec §4.I): the one subsystem that owns the shared CDP
//! session. An explicit state machine (`Disabled → Enabled → Paused →
//! Enabled`), a breakpoint registry, and sequential-awaited fan-out to
//! every registered pause callback — mirrored on the navigation-callback
//! slot pattern used elsewhere in this codebase for event fan-out.

pub mod blackbox;
pub mod event_breakpoints;
pub mod session_io;
pub mod watch;
pub mod xhr_breakpoints;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::js_protocol::debugger as cdp_debugger;
use futures::future::BoxFuture;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{error, warn};

use crate::browser::CdpSession;
use crate::error::{Result, ServerError};

use self::blackbox::BlackboxManager;
use self::event_breakpoints::EventBreakpointManager;
use self::watch::WatchExpressionManager;
use self::xhr_breakpoints::XhrBreakpointManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebuggerState {
    Disabled,
    Enabled,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseOnExceptions {
    None,
    Uncaught,
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointLocation {
    pub script_id: Option<String>,
    pub url: Option<String>,
    pub line_number: i64,
    pub column_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakpoint {
    pub breakpoint_id: String,
    pub location: BreakpointLocation,
    pub condition: Option<String>,
    pub enabled: bool,
    pub hit_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub script_id: String,
    pub line_number: i64,
    pub column_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub r#type: String,
    pub object_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallFrame {
    pub call_frame_id: String,
    pub function_name: String,
    pub location: Location,
    pub url: Option<String>,
    pub scope_chain: Vec<Scope>,
    pub this: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PausedState {
    pub call_frames: Vec<CallFrame>,
    pub reason: String,
    pub hit_breakpoints: Vec<String>,
    pub data: Option<Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakpointHitEvent {
    pub paused: PausedState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeVariable {
    pub name: String,
    pub value: Value,
    pub r#type: String,
    pub scope: String,
    pub writable: bool,
    pub configurable: bool,
    pub enumerable: bool,
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GetScopeVariablesOptions {
    pub call_frame_id: Option<String>,
    pub include_object_properties: bool,
    pub max_depth: u32,
    pub skip_errors: bool,
}

impl GetScopeVariablesOptions {
    pub fn defaults() -> Self {
        Self {
            call_frame_id: None,
            include_object_properties: false,
            max_depth: 1,
            skip_errors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ScopeVariablesResult {
    pub variables: Vec<ScopeVariable>,
    pub errors: Vec<String>,
}

type HitCallback = Arc<dyn Fn(BreakpointHitEvent) -> BoxFuture<'static, ()> + Send + Sync>;

struct Listeners {
    event_task: Option<tokio::task::JoinHandle<()>>,
}

struct Registry {
    breakpoints: HashMap<String, Breakpoint>,
    pause_on_exceptions: PauseOnExceptions,
}

pub struct DebuggerCore {
    session: CdpSession,
    state: RwLock<DebuggerState>,
    paused: RwLock<Option<PausedState>>,
    registry: RwLock<Registry>,
    callbacks: RwLock<Vec<HitCallback>>,
    waiters: Mutex<VecDeque<(u64, oneshot::Sender<PausedState>)>>,
    next_waiter_id: std::sync::atomic::AtomicU64,
    listeners: Mutex<Listeners>,

    pub watch: WatchExpressionManager,
    pub xhr_breakpoints: XhrBreakpointManager,
    pub event_breakpoints: EventBreakpointManager,
    pub blackbox: BlackboxManager,
}

impl DebuggerCore {
    pub fn new(session: CdpSession) -> Arc<Self> {
        Arc::new(Self {
            watch: WatchExpressionManager::new(session.clone()),
            xhr_breakpoints: XhrBreakpointManager::new(session.clone()),
            event_breakpoints: EventBreakpointManager::new(session.clone()),
            blackbox: BlackboxManager::new(session.clone()),
            session,
            state: RwLock::new(DebuggerState::Disabled),
            paused: RwLock::new(None),
            registry: RwLock::new(Registry {
                breakpoints: HashMap::new(),
                pause_on_exceptions: PauseOnExceptions::None,
            }),
            callbacks: RwLock::new(Vec::new()),
            waiters: Mutex::new(VecDeque::new()),
            next_waiter_id: std::sync::atomic::AtomicU64::new(0),
            listeners: Mutex::new(Listeners { event_task: None }),
        })
    }

    pub async fn state(&self) -> DebuggerState {
        *self.state.read().await
    }

    pub async fn register_callback(&self, callback: HitCallback) {
        self.callbacks.write().await.push(callback);
    }

    pub async fn enable(self: &Arc<Self>) -> Result<()> {
        if *self.state.read().await != DebuggerState::Disabled {
            return Ok(());
        }

        self.session
            .execute_raw("Debugger.enable", serde_json::json!({}))
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to enable Debugger domain: {e}")))?;

        let this = self.clone();
        let page = self.session.page().clone();
        let task = tokio::spawn(async move {
            let paused = page.event_listener::<cdp_debugger::EventPaused>().await;
            let resumed = page.event_listener::<cdp_debugger::EventResumed>().await;
            let resolved = page
                .event_listener::<cdp_debugger::EventBreakpointResolved>()
                .await;

            let (mut paused, mut resumed, mut resolved) = match (paused, resumed, resolved) {
                (Ok(p), Ok(r), Ok(b)) => (p, r, b),
                _ => {
                    warn!("failed to subscribe to one or more Debugger events");
                    return;
                }
            };

            loop {
                tokio::select! {
                    Some(event) = paused.next() => this.on_paused(&event).await,
                    Some(_event) = resumed.next() => this.on_resumed().await,
                    Some(event) = resolved.next() => this.on_breakpoint_resolved(&event).await,
                    else => break,
                }
            }
        });

        self.listeners.lock().await.event_task = Some(task);
        *self.state.write().await = DebuggerState::Enabled;
        Ok(())
    }

    async fn on_paused(&self, event: &cdp_debugger::EventPaused) {
        let value = serde_json::to_value(event).unwrap_or_default();
        let call_frames = value
            .get("callFrames")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
            .iter()
            .map(|cf| CallFrame {
                call_frame_id: cf
                    .get("callFrameId")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                function_name: cf
                    .get("functionName")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                location: Location {
                    script_id: cf
                        .pointer("/location/scriptId")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    line_number: cf.pointer("/location/lineNumber").and_then(|v| v.as_i64()).unwrap_or(0),
                    column_number: cf.pointer("/location/columnNumber").and_then(|v| v.as_i64()),
                },
                url: None,
                scope_chain: cf
                    .get("scopeChain")
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .map(|s| Scope {
                        r#type: s.get("type").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        object_id: s.pointer("/object/objectId").and_then(|v| v.as_str()).map(str::to_string),
                        name: s.get("name").and_then(|v| v.as_str()).map(str::to_string),
                    })
                    .collect(),
                this: cf.get("this").cloned().unwrap_or(Value::Null),
            })
            .collect::<Vec<_>>();

        let hit_breakpoints: Vec<String> = value
            .get("hitBreakpoints")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        let state = PausedState {
            call_frames,
            reason: value.get("reason").and_then(|v| v.as_str()).unwrap_or("other").to_string(),
            hit_breakpoints: hit_breakpoints.clone(),
            data: value.get("data").cloned(),
            timestamp: chrono::Utc::now(),
        };

        *self.state.write().await = DebuggerState::Paused;
        *self.paused.write().await = Some(state.clone());

        {
            let mut registry = self.registry.write().await;
            for id in &hit_breakpoints {
                if let Some(bp) = registry.breakpoints.get_mut(id) {
                    bp.hit_count += 1;
                }
            }
        }

        if let Some((_, sender)) = self.waiters.lock().await.pop_front() {
            let _ = sender.send(state.clone());
        }

        let callbacks = self.callbacks.read().await.clone();
        for callback in callbacks {
            callback(BreakpointHitEvent { paused: state.clone() }).await;
        }
    }

    async fn on_resumed(&self) {
        *self.state.write().await = DebuggerState::Enabled;
        *self.paused.write().await = None;
    }

    async fn on_breakpoint_resolved(&self, event: &cdp_debugger::EventBreakpointResolved) {
        let value = serde_json::to_value(event).unwrap_or_default();
        let Some(id) = value.get("breakpointId").and_then(|v| v.as_str()) else { return };
        if let Some(bp) = self.registry.write().await.breakpoints.get_mut(id) {
            if let Some(loc) = value.get("location") {
                bp.location.script_id = loc.get("scriptId").and_then(|v| v.as_str()).map(str::to_string);
                bp.location.line_number = loc.get("lineNumber").and_then(|v| v.as_i64()).unwrap_or(bp.location.line_number);
            }
        }
    }

    fn require_enabled_sync(state: DebuggerState) -> Result<()> {
        if state == DebuggerState::Disabled {
            return Err(ServerError::PreconditionFailed("Debugger not enabled".into()));
        }
        Ok(())
    }

    pub async fn set_breakpoint(
        &self,
        location: BreakpointLocation,
        condition: Option<String>,
    ) -> Result<Breakpoint> {
        Self::require_enabled_sync(*self.state.read().await)?;

        let method = if location.url.is_some() {
            "Debugger.setBreakpointByUrl"
        } else {
            "Debugger.setBreakpoint"
        };
        let params = if let Some(url) = &location.url {
            serde_json::json!({
                "url": url,
                "lineNumber": location.line_number,
                "columnNumber": location.column_number,
                "condition": condition,
            })
        } else {
            serde_json::json!({
                "location": {
                    "scriptId": location.script_id,
                    "lineNumber": location.line_number,
                    "columnNumber": location.column_number,
                },
                "condition": condition,
            })
        };

        let response = self.session.execute_raw(method, params).await?;
        let breakpoint_id = response
            .get("breakpointId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ServerError::Cdp("CDP did not return a breakpointId".into()))?
            .to_string();

        let bp = Breakpoint {
            breakpoint_id: breakpoint_id.clone(),
            location,
            condition,
            enabled: true,
            hit_count: 0,
            created_at: chrono::Utc::now(),
        };
        self.registry.write().await.breakpoints.insert(breakpoint_id, bp.clone());
        Ok(bp)
    }

    pub async fn remove_breakpoint(&self, breakpoint_id: &str) -> Result<()> {
        Self::require_enabled_sync(*self.state.read().await)?;
        if !self.registry.read().await.breakpoints.contains_key(breakpoint_id) {
            return Err(ServerError::NotFound(format!("breakpoint `{breakpoint_id}` not found")));
        }
        let params = serde_json::json!({ "breakpointId": breakpoint_id });
        self.session.execute_raw("Debugger.removeBreakpoint", params).await?;
        self.registry.write().await.breakpoints.remove(breakpoint_id);
        Ok(())
    }

    pub async fn list_breakpoints(&self) -> Vec<Breakpoint> {
        self.registry.read().await.breakpoints.values().cloned().collect()
    }

    pub async fn clear_all_breakpoints(&self) -> Result<()> {
        let ids: Vec<String> = self.registry.read().await.breakpoints.keys().cloned().collect();
        for id in ids {
            self.remove_breakpoint(&id).await?;
        }
        Ok(())
    }

    pub async fn set_pause_on_exceptions(&self, mode: PauseOnExceptions) -> Result<()> {
        Self::require_enabled_sync(*self.state.read().await)?;
        let state_str = match mode {
            PauseOnExceptions::None => "none",
            PauseOnExceptions::Uncaught => "uncaught",
            PauseOnExceptions::All => "all",
        };
        let params = serde_json::json!({ "state": state_str });
        self.session.execute_raw("Debugger.setPauseOnExceptions", params).await?;
        self.registry.write().await.pause_on_exceptions = mode;
        Ok(())
    }

    pub async fn pause_on_exceptions_state(&self) -> PauseOnExceptions {
        self.registry.read().await.pause_on_exceptions
    }

    pub async fn pause(&self) -> Result<()> {
        Self::require_enabled_sync(*self.state.read().await)?;
        self.session.execute_raw("Debugger.pause", serde_json::json!({})).await?;
        Ok(())
    }

    async fn require_paused(&self) -> Result<()> {
        if *self.state.read().await != DebuggerState::Paused {
            return Err(ServerError::PreconditionFailed("Not in paused state".into()));
        }
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        self.require_paused().await?;
        self.session.execute_raw("Debugger.resume", serde_json::json!({})).await?;
        Ok(())
    }

    pub async fn step_into(&self) -> Result<()> {
        self.require_paused().await?;
        self.session.execute_raw("Debugger.stepInto", serde_json::json!({})).await?;
        Ok(())
    }

    pub async fn step_over(&self) -> Result<()> {
        self.require_paused().await?;
        self.session.execute_raw("Debugger.stepOver", serde_json::json!({})).await?;
        Ok(())
    }

    pub async fn step_out(&self) -> Result<()> {
        self.require_paused().await?;
        self.session.execute_raw("Debugger.stepOut", serde_json::json!({})).await?;
        Ok(())
    }

    pub async fn evaluate_on_call_frame(&self, call_frame_id: &str, expression: &str) -> Result<Value> {
        self.require_paused().await?;
        let params = serde_json::json!({
            "callFrameId": call_frame_id,
            "expression": expression,
            "returnByValue": true,
        });
        let response = self.session.execute_raw("Debugger.evaluateOnCallFrame", params).await?;
        Ok(response.get("result").and_then(|r| r.get("value")).cloned().unwrap_or(Value::Null))
    }

    pub async fn get_scope_variables(&self, opts: GetScopeVariablesOptions) -> Result<ScopeVariablesResult> {
        self.require_paused().await?;
        let paused = self.paused.read().await.clone().ok_or_else(|| {
            ServerError::Internal("state machine says Paused but no PausedState recorded".into())
        })?;

        let frame = if let Some(id) = &opts.call_frame_id {
            paused.call_frames.iter().find(|f| &f.call_frame_id == id)
        } else {
            paused.call_frames.first()
        };
        let Some(frame) = frame else {
            return Err(ServerError::NotFound("no matching call frame in the paused state".into()));
        };

        let mut variables = Vec::new();
        let mut errors = Vec::new();

        for scope in &frame.scope_chain {
            let Some(object_id) = &scope.object_id else { continue };
            let params = serde_json::json!({ "objectId": object_id, "ownProperties": true });
            match self.session.execute_raw("Runtime.getProperties", params).await {
                Ok(response) => {
                    let props = response.get("result").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                    for prop in props {
                        let name = prop.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                        if name == "__proto__" {
                            continue;
                        }
                        let value_obj = prop.get("value").cloned().unwrap_or(Value::Null);
                        let var = ScopeVariable {
                            name: name.clone(),
                            value: value_obj.get("value").cloned().unwrap_or(Value::Null),
                            r#type: value_obj.get("type").and_then(|v| v.as_str()).unwrap_or("undefined").to_string(),
                            scope: scope.r#type.clone(),
                            writable: prop.get("writable").and_then(|v| v.as_bool()).unwrap_or(false),
                            configurable: prop.get("configurable").and_then(|v| v.as_bool()).unwrap_or(false),
                            enumerable: prop.get("enumerable").and_then(|v| v.as_bool()).unwrap_or(false),
                            object_id: value_obj.get("objectId").and_then(|v| v.as_str()).map(str::to_string),
                        };

                        if opts.include_object_properties && opts.max_depth > 0 {
                            if let Some(child_object_id) = &var.object_id {
                                let child_params = serde_json::json!({ "objectId": child_object_id, "ownProperties": true });
                                match self.session.execute_raw("Runtime.getProperties", child_params).await {
                                    Ok(child_response) => {
                                        let child_props = child_response.get("result").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                                        for child_prop in child_props {
                                            let child_name = child_prop.get("name").and_then(|v| v.as_str()).unwrap_or_default();
                                            if child_name == "__proto__" {
                                                continue;
                                            }
                                            let child_value_obj = child_prop.get("value").cloned().unwrap_or(Value::Null);
                                            variables.push(ScopeVariable {
                                                name: format!("{}.{}", var.name, child_name),
                                                value: child_value_obj.get("value").cloned().unwrap_or(Value::Null),
                                                r#type: child_value_obj.get("type").and_then(|v| v.as_str()).unwrap_or("undefined").to_string(),
                                                scope: scope.r#type.clone(),
                                                writable: child_prop.get("writable").and_then(|v| v.as_bool()).unwrap_or(false),
                                                configurable: child_prop.get("configurable").and_then(|v| v.as_bool()).unwrap_or(false),
                                                enumerable: child_prop.get("enumerable").and_then(|v| v.as_bool()).unwrap_or(false),
                                                object_id: child_value_obj.get("objectId").and_then(|v| v.as_str()).map(str::to_string),
                                            });
                                        }
                                    }
                                    Err(err) => {
                                        if opts.skip_errors {
                                            errors.push(format!("scope {}: {err}", scope.r#type));
                                        } else {
                                            return Err(err);
                                        }
                                    }
                                }
                            }
                        }
                        variables.push(var);
                    }
                }
                Err(err) => {
                    if opts.skip_errors {
                        errors.push(format!("scope {}: {err}", scope.r#type));
                    } else {
                        return Err(err);
                    }
                }
            }
        }

        Ok(ScopeVariablesResult { variables, errors })
    }

    pub async fn wait_for_paused(&self, timeout: Duration) -> Result<PausedState> {
        if let Some(state) = self.paused.read().await.clone() {
            return Ok(state);
        }

        let id = self
            .next_waiter_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.push_back((id, tx));

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(_)) => Err(ServerError::Internal("pause waiter channel closed unexpectedly".into())),
            Err(_) => {
                self.waiters.lock().await.retain(|(waiter_id, _)| *waiter_id != id);
                Err(ServerError::Timeout(timeout))
            }
        }
    }

    pub async fn current_paused_state(&self) -> Option<PausedState> {
        self.paused.read().await.clone()
    }

    /// Idempotent; unsubscribes listeners, detaches CDP, and clears the
    /// registry and waiters. Never leaks listeners across repeated
    /// `enable`/`disable` cycles.
    pub async fn disable(&self) -> Result<()> {
        if *self.state.read().await == DebuggerState::Disabled {
            return Ok(());
        }

        if let Some(task) = self.listeners.lock().await.event_task.take() {
            task.abort();
        }

        if let Err(err) = self.session.execute_raw("Debugger.disable", serde_json::json!({})).await {
            error!("Debugger.disable failed during teardown (ignored): {err}");
        }

        *self.state.write().await = DebuggerState::Disabled;
        *self.paused.write().await = None;
        self.registry.write().await.breakpoints.clear();
        self.waiters.lock().await.clear();
        self.callbacks.write().await.clear();
        Ok(())
    }

    pub async fn export_session(&self) -> session_io::SessionSnapshot {
        let registry = self.registry.read().await;
        session_io::SessionSnapshot {
            version: "1.0".to_string(),
            timestamp: chrono::Utc::now(),
            breakpoints: registry.breakpoints.values().cloned().collect(),
            pause_on_exceptions: registry.pause_on_exceptions,
            metadata: None,
        }
    }

    pub async fn import_session(&self, snapshot: session_io::SessionSnapshot) -> Result<()> {
        self.clear_all_breakpoints().await?;
        for bp in snapshot.breakpoints {
            self.set_breakpoint(bp.location, bp.condition).await?;
        }
        self.set_pause_on_exceptions(snapshot.pause_on_exceptions).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_on_exceptions_round_trips_through_serde() {
        let value = serde_json::to_value(PauseOnExceptions::Uncaught).unwrap();
        assert_eq!(value, serde_json::json!("uncaught"));
    }
}
