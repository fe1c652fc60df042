//! Process-scoped services, injected into every tool call as an explicit
//! context value rather than true global state — per the "shared mutable
//! singletons" design note, this keeps the services swappable in tests.

use std::sync::Arc;

use serde_json::Value;

use crate::analysis::LLMProvider;
use crate::browser::BrowserSessionManager;
use crate::budget::TokenBudget;
use crate::cache::UnifiedCacheCoordinator;
use crate::code_cache::CodeCache;
use crate::console::ConsoleMonitor;
use crate::debugger::DebuggerCore;
use crate::detail_store::{DetailStore, DEFAULT_THRESHOLD_BYTES};
use crate::error::{ErrorBody, Result};
use crate::hooks::{HookEngine, HookRecordStore};
use crate::network::NetworkRecorder;
use crate::script_catalog::ScriptCatalog;
use tokio::sync::Mutex;

/// Per-process, lazily-populated handles to subsystems that depend on an
/// active CDP session. `ToolContext` itself is created once at startup;
/// the session-bound subsystems are created on first use by
/// `ensure_session_subsystems`.
pub struct ToolContext {
    pub browser: Arc<BrowserSessionManager>,
    pub budget: Arc<TokenBudget>,
    pub details: Arc<DetailStore>,
    pub caches: Arc<UnifiedCacheCoordinator>,
    pub code_cache: Arc<CodeCache>,
    pub hooks: Arc<HookEngine>,
    pub hook_records: Arc<HookRecordStore>,
    pub llm: Arc<dyn LLMProvider>,
    pub server_name: String,
    pub server_version: String,

    session_subsystems: Mutex<Option<SessionSubsystems>>,
}

#[derive(Clone)]
pub struct SessionSubsystems {
    pub console: Arc<ConsoleMonitor>,
    pub network: Arc<NetworkRecorder>,
    pub scripts: Arc<ScriptCatalog>,
    pub debugger: Arc<DebuggerCore>,
}

impl ToolContext {
    pub fn new(
        browser: Arc<BrowserSessionManager>,
        budget: Arc<TokenBudget>,
        details: Arc<DetailStore>,
        caches: Arc<UnifiedCacheCoordinator>,
        code_cache: Arc<CodeCache>,
        llm: Arc<dyn LLMProvider>,
        server_name: String,
        server_version: String,
    ) -> Self {
        Self {
            browser,
            budget,
            details,
            caches,
            code_cache,
            hooks: Arc::new(HookEngine::new()),
            hook_records: Arc::new(HookRecordStore::new()),
            llm,
            server_name,
            server_version,
            session_subsystems: Mutex::new(None),
        }
    }

    /// Lazily constructs the session-bound subsystems (Console, Network,
    /// Script Catalog, Debugger), each on its own `CdpSession` per spec's
    /// domain-ownership rule, the first time any tool needs them.
    pub async fn ensure_session_subsystems(&self) -> Result<SessionSubsystems> {
        let mut guard = self.session_subsystems.lock().await;
        if let Some(subsystems) = guard.as_ref() {
            return Ok(subsystems.clone());
        }

        let session = self.browser.get_active_page().await?;
        let console = Arc::new(ConsoleMonitor::new(session.clone()));
        let network = Arc::new(NetworkRecorder::new(session.clone(), console.clone()));
        let scripts = ScriptCatalog::new(session.clone()).await?;
        let debugger = DebuggerCore::new(session.clone());

        self.caches.register(scripts.clone()).await;

        let subsystems = SessionSubsystems {
            console,
            network,
            scripts,
            debugger,
        };
        *guard = Some(subsystems.clone());
        Ok(subsystems)
    }

    pub async fn reset_session_subsystems(&self) {
        *self.session_subsystems.lock().await = None;
    }

    /// Applies Detail-ID smart-handling to a tool result before it is
    /// shaped into the MCP content envelope.
    pub async fn smart_handle(&self, data: Value) -> Result<Value> {
        match self.details.smart_handle(data, DEFAULT_THRESHOLD_BYTES).await? {
            crate::detail_store::SmartHandleResult::Inline(v) => Ok(v),
            crate::detail_store::SmartHandleResult::Handle(h) => Ok(serde_json::to_value(h)?),
        }
    }
}

/// Shapes a successful tool result into the MCP content envelope, per
/// spec §4.K: always `{content:[{type:"text", text:JSON}]}`.
pub fn ok_envelope(data: &Value) -> Value {
    serde_json::json!({
        "success": true,
        "data": data,
    })
}

pub fn error_envelope(body: &ErrorBody) -> Value {
    serde_json::to_value(body).unwrap_or(Value::Null)
}
