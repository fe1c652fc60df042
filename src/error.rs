//! Crate-wide error taxonomy, grounded on the semantic categories in the
//! tool server's error handling design: invalid argument, precondition not
//! met, not found, timeout, remote (CDP) failure, and exhaustion.

use serde::Serialize;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("precondition not met: {0}")]
    PreconditionFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("CDP command failed: {0}")]
    Cdp(String),

    #[error("browser not available: {0}")]
    BrowserUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    /// Machine-readable category, used by `tools::context` to shape the
    /// `nextSteps`/`solution` hint that accompanies every error result.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::Cdp(_) => "remote_failure",
            Self::BrowserUnavailable(_) => "remote_failure",
            Self::Io(_) | Self::Serde(_) | Self::Internal(_) => "internal",
        }
    }

    /// An actionable hint for the calling LLM, per spec's "Propagation
    /// policy" — errors carry a `nextSteps` field rather than a bare
    /// message whenever the caller's next action is inferable.
    pub fn next_steps(&self) -> Option<String> {
        match self {
            Self::PreconditionFailed(msg) if msg.contains("Debugger not enabled") => {
                Some("Call debugger_enable before any breakpoint/pause/step tool.".into())
            }
            Self::PreconditionFailed(msg) if msg.contains("Not in paused state") => {
                Some("Call debugger_pause or wait for a breakpoint hit before this tool.".into())
            }
            Self::PreconditionFailed(msg) if msg.contains("Network monitoring not enabled") => {
                Some("Call network_enable before fetching requests or response bodies.".into())
            }
            Self::NotFound(msg) if msg.starts_with("breakpoint") => {
                Some("Use breakpoint_list to see currently registered breakpoint ids.".into())
            }
            Self::NotFound(msg) if msg.starts_with("detail id") => {
                Some(
                    "The handle has expired or was evicted; re-run the original tool call to \
                     obtain a fresh detailId."
                        .into(),
                )
            }
            _ => None,
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            message: self.to_string(),
            category: self.category(),
            next_steps: self.next_steps(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub category: &'static str,
    #[serde(rename = "nextSteps", skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,
}
