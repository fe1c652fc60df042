//! Token Budget (spec §4.B): a process-wide accounting service. Injected as
//! an explicit `Arc<TokenBudget>` context value rather than a true global,
//! per the "shared mutable singletons" design note.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::cache::UnifiedCacheCoordinator;
use crate::detail_store::DetailStore;

pub const MAX_TOKENS: u64 = 200_000;
const THRESHOLDS: [u8; 3] = [80, 90, 95];
const TOOL_RECORD_RETENTION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub tool_name: String,
    #[serde(skip)]
    pub at: Instant,
    pub request_size: usize,
    pub response_size: usize,
    pub estimated_tokens: u64,
    pub cumulative_tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetStats {
    pub current_usage: u64,
    pub max_tokens: u64,
    pub usage_ratio: f64,
    pub triggered_thresholds: Vec<u8>,
    pub history_len: usize,
}

struct Inner {
    current_usage: u64,
    history: Vec<ToolCallRecord>,
    triggered_thresholds: Vec<u8>,
}

/// Warning emitted when a call crosses a threshold for the first time since
/// the last time usage dropped back below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdWarning(pub u8);

pub struct TokenBudget {
    inner: Mutex<Inner>,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBudget {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                current_usage: 0,
                history: Vec::new(),
                triggered_thresholds: Vec::new(),
            }),
        }
    }

    fn estimate_tokens(request_bytes: usize, response_bytes: usize) -> u64 {
        ((request_bytes + response_bytes) as u64).div_ceil(4)
    }

    /// Records one completed tool call and returns any newly-crossed
    /// threshold warnings plus whether auto-cleanup should run (>=90%).
    pub async fn record_call(
        &self,
        tool_name: &str,
        request_bytes: usize,
        response_bytes: usize,
    ) -> (Vec<ThresholdWarning>, bool) {
        let mut guard = self.inner.lock().await;
        let tokens = Self::estimate_tokens(request_bytes, response_bytes);
        guard.current_usage += tokens;
        guard.history.push(ToolCallRecord {
            tool_name: tool_name.to_string(),
            at: Instant::now(),
            request_size: request_bytes,
            response_size: response_bytes,
            estimated_tokens: tokens,
            cumulative_tokens: guard.current_usage,
        });

        let ratio = (guard.current_usage as f64 / MAX_TOKENS as f64) * 100.0;
        let mut warnings = Vec::new();
        for &threshold in &THRESHOLDS {
            let crossed = ratio >= threshold as f64;
            let already = guard.triggered_thresholds.contains(&threshold);
            if crossed && !already {
                guard.triggered_thresholds.push(threshold);
                warnings.push(ThresholdWarning(threshold));
            }
        }
        let should_cleanup = ratio >= 90.0;
        (warnings, should_cleanup)
    }

    /// Three-step auto-cleanup run at >=90% usage: clear detail ids, drop
    /// stale tool-call history, recompute usage, downgrade thresholds that
    /// no longer apply.
    pub async fn auto_cleanup(&self, details: &DetailStore, _caches: &UnifiedCacheCoordinator) {
        details.clear().await;

        let mut guard = self.inner.lock().await;
        let cutoff = Instant::now() - TOOL_RECORD_RETENTION;
        guard.history.retain(|r| r.at >= cutoff);

        let mut running = 0u64;
        for record in &mut guard.history {
            running += record.estimated_tokens;
            record.cumulative_tokens = running;
        }
        guard.current_usage = running;

        let ratio = (guard.current_usage as f64 / MAX_TOKENS as f64) * 100.0;
        guard.triggered_thresholds.retain(|&t| ratio > t as f64);
    }

    pub async fn manual_cleanup(&self, details: &DetailStore, caches: &UnifiedCacheCoordinator) {
        self.auto_cleanup(details, caches).await;
    }

    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        guard.current_usage = 0;
        guard.history.clear();
        guard.triggered_thresholds.clear();
    }

    pub async fn stats(&self) -> BudgetStats {
        let guard = self.inner.lock().await;
        BudgetStats {
            current_usage: guard.current_usage,
            max_tokens: MAX_TOKENS,
            usage_ratio: guard.current_usage as f64 / MAX_TOKENS as f64,
            triggered_thresholds: guard.triggered_thresholds.clone(),
            history_len: guard.history.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn warns_exactly_once_per_threshold_crossing() {
        let budget = TokenBudget::new();
        // 80% of 200_000 tokens = 160_000 tokens = 640_000 bytes of combined JSON.
        let (warnings, cleanup) = budget.record_call("t1", 0, 640_000).await;
        assert_eq!(warnings, vec![ThresholdWarning(80)]);
        assert!(!cleanup);

        // Re-crossing 80% on the next call at the same ratio must not re-warn.
        let (warnings, _) = budget.record_call("t2", 0, 1).await;
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn crossing_ninety_percent_triggers_cleanup_flag() {
        let budget = TokenBudget::new();
        let (_warnings, cleanup) = budget.record_call("big", 0, 720_000).await;
        assert!(cleanup);
    }

    #[tokio::test]
    async fn reset_clears_history_and_usage() {
        let budget = TokenBudget::new();
        budget.record_call("x", 0, 1000).await;
        budget.reset().await;
        let stats = budget.stats().await;
        assert_eq!(stats.current_usage, 0);
        assert_eq!(stats.history_len, 0);
        assert!(stats.triggered_thresholds.is_empty());
    }
}
