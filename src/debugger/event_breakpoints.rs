//! EventBreakpointManager (spec §4.I): `DOMDebugger.set/removeEventListenerBreakpoint`
//! plus predefined bundles (mouse, keyboard, timer, WebSocket).

use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::browser::CdpSession;
use crate::error::Result;

pub const MOUSE_EVENTS: &[&str] = &["click", "mousedown", "mouseup", "mousemove"];
pub const KEYBOARD_EVENTS: &[&str] = &["keydown", "keyup", "keypress"];
pub const TIMER_EVENTS: &[&str] = &["setTimeout", "setInterval", "clearTimeout", "clearInterval"];
pub const WEBSOCKET_EVENTS: &[&str] = &["send", "close"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBundle {
    Mouse,
    Keyboard,
    Timer,
    WebSocket,
}

impl EventBundle {
    pub fn event_names(self) -> &'static [&'static str] {
        match self {
            Self::Mouse => MOUSE_EVENTS,
            Self::Keyboard => KEYBOARD_EVENTS,
            Self::Timer => TIMER_EVENTS,
            Self::WebSocket => WEBSOCKET_EVENTS,
        }
    }
}

pub struct EventBreakpointManager {
    session: CdpSession,
    active: RwLock<HashSet<String>>,
}

impl EventBreakpointManager {
    pub fn new(session: CdpSession) -> Self {
        Self {
            session,
            active: RwLock::new(HashSet::new()),
        }
    }

    pub async fn set(&self, event_name: &str) -> Result<()> {
        let params = serde_json::json!({ "eventName": event_name });
        self.session
            .execute_raw("DOMDebugger.setEventListenerBreakpoint", params)
            .await?;
        self.active.write().await.insert(event_name.to_string());
        Ok(())
    }

    pub async fn remove(&self, event_name: &str) -> Result<()> {
        let params = serde_json::json!({ "eventName": event_name });
        self.session
            .execute_raw("DOMDebugger.removeEventListenerBreakpoint", params)
            .await?;
        self.active.write().await.remove(event_name);
        Ok(())
    }

    pub async fn set_bundle(&self, bundle: EventBundle) -> Result<()> {
        for event_name in bundle.event_names() {
            self.set(event_name).await?;
        }
        Ok(())
    }

    pub async fn active(&self) -> Vec<String> {
        self.active.read().await.iter().cloned().collect()
    }
}
