//! Browser Session Manager (spec §4.E): owns the Chromium process, the
//! active page, and hands out the CDP session handle every other
//! subsystem builds on.
//!
//! `CdpSession` wraps the one `chromiumoxide::Page` handle for the active
//! page. chromiumoxide's `Page` already multiplexes CDP commands/events
//! over a single WebSocket per target, so "a separate session per
//! subsystem" (spec §5) is enforced here at the type level — each
//! subsystem is constructed with its own `CdpSession` clone and is the sole
//! owner of a given CDP domain's event subscription — rather than by
//! opening additional OS-level connections, which chromiumoxide does not
//! expose as a public API distinct from the page itself.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::Browser;
use chromiumoxide::BrowserConfig as CdpBrowserConfig;
use chromiumoxide::Page as CdpPage;
use chromiumoxide::browser::HeadlessMode;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::raw_cdp::RawCdpCommand;
use crate::config::BrowserLaunchConfig;
use crate::error::{Result, ServerError};

/// A handle to the active page's CDP transport. Cheap to clone; every
/// subsystem that needs CDP access holds one of these.
#[derive(Clone)]
pub struct CdpSession {
    page: Arc<CdpPage>,
}

impl CdpSession {
    pub fn page(&self) -> &Arc<CdpPage> {
        &self.page
    }

    /// Execute an arbitrary CDP method with JSON params, used by tools that
    /// need to issue a command no typed wrapper exists for yet (and by
    /// `debugger_execute_cdp`-style escape hatches).
    pub async fn execute_raw(&self, method: &str, params: Value) -> Result<Value> {
        let cmd = RawCdpCommand::new(method, params);
        let resp = self
            .page
            .execute(cmd)
            .await
            .map_err(|e| ServerError::Cdp(e.to_string()))?;
        Ok(resp.result)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowserStatus {
    pub enabled: bool,
    pub browser_active: bool,
    pub current_url: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

pub struct BrowserSessionManager {
    config: BrowserLaunchConfig,
    browser: Mutex<Option<Browser>>,
    page: Mutex<Option<Arc<CdpPage>>>,
    event_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl BrowserSessionManager {
    pub fn new(config: BrowserLaunchConfig) -> Self {
        Self {
            config,
            browser: Mutex::new(None),
            page: Mutex::new(None),
            event_task: Mutex::new(None),
        }
    }

    async fn ensure_browser(&self) -> Result<()> {
        if self.browser.lock().await.is_some() {
            return Ok(());
        }

        let headless = if self.config.headless {
            HeadlessMode::True
        } else {
            HeadlessMode::False
        };
        let cdp_config = CdpBrowserConfig::builder()
            .headless_mode(headless)
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .request_timeout(self.config.timeout)
            .build()
            .map_err(ServerError::Internal)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to launch browser: {e}")))?;

        let event_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!("chromiumoxide handler event error: {err}");
                }
            }
        });

        *self.event_task.lock().await = Some(event_task);
        *self.browser.lock().await = Some(browser);
        info!("browser launched (headless={})", self.config.headless);
        Ok(())
    }

    /// Lazily opens a page on first request, per spec's `getActivePage()`.
    pub async fn get_active_page(&self) -> Result<CdpSession> {
        self.ensure_browser().await?;

        let mut page_guard = self.page.lock().await;
        if let Some(page) = page_guard.as_ref() {
            return Ok(CdpSession { page: page.clone() });
        }

        let mut browser_guard = self.browser.lock().await;
        let browser = browser_guard
            .as_mut()
            .ok_or_else(|| ServerError::BrowserUnavailable("browser not launched".into()))?;
        let cdp_page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ServerError::Cdp(format!("failed to open page: {e}")))?;
        let page = Arc::new(cdp_page);
        *page_guard = Some(page.clone());
        debug!("active page created");
        Ok(CdpSession { page })
    }

    /// Returns the active page's session without creating one; used by
    /// tools that must fail fast ("browser not available") rather than
    /// silently relaunching, per the failure model in spec §4.E.
    pub async fn require_active_page(&self) -> Result<CdpSession> {
        let page_guard = self.page.lock().await;
        match page_guard.as_ref() {
            Some(page) => Ok(CdpSession { page: page.clone() }),
            None => Err(ServerError::BrowserUnavailable(
                "no active page; call browser_launch first".into(),
            )),
        }
    }

    pub async fn status(&self) -> Result<BrowserStatus> {
        let browser_active = self.browser.lock().await.is_some();
        let current_url = if let Some(page) = self.page.lock().await.as_ref() {
            page.url().await.ok().flatten()
        } else {
            None
        };
        Ok(BrowserStatus {
            enabled: true,
            browser_active,
            current_url,
            viewport_width: self.config.viewport_width,
            viewport_height: self.config.viewport_height,
        })
    }

    pub async fn navigate(&self, url: &str) -> Result<String> {
        let session = self.get_active_page().await?;
        session
            .page()
            .goto(url)
            .await
            .map_err(|e| ServerError::Cdp(format!("navigation failed: {e}")))?;
        session
            .page()
            .wait_for_navigation()
            .await
            .map_err(|e| ServerError::Cdp(format!("navigation wait failed: {e}")))?;
        session
            .page()
            .url()
            .await
            .map_err(|e| ServerError::Cdp(e.to_string()))?
            .ok_or_else(|| ServerError::Cdp("page has no URL after navigation".into()))
    }

    /// Tears down the browser and detaches CDP. Idempotent: a
    /// second `close()` is a no-op, per the teardown failure model (CDP
    /// errors during cleanup are logged and swallowed).
    pub async fn close(&self) -> Result<()> {
        *self.page.lock().await = None;
        if let Some(handle) = self.event_task.lock().await.take() {
            handle.abort();
        }
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                warn!("error closing browser (ignored during teardown): {err}");
            }
            if let Err(err) = browser.wait().await {
                warn!("error waiting on browser shutdown (ignored): {err}");
            }
        }
        Ok(())
    }

    /// How long tools should wait for a single CDP round-trip before
    /// surfacing a timeout error, per spec's default 30s cancellation rule.
    pub fn default_timeout(&self) -> Duration {
        self.config.timeout
    }
}
