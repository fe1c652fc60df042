//! End-to-end scenarios over the tool registry that don't require a live
//! Chromium session: detail-id externalization, token-budget warning/cleanup
//! sequencing, session export/import round-trip, and hook-record tools.
//! Scenarios that need a real CDP connection (breakpoint hits, scope
//! retrieval, network capture) are out of this crate's test scope per
//! SPEC_FULL.md's test-tooling notes.

use std::sync::Arc;

use jsre_mcp_server::analysis::FakeLlmProvider;
use jsre_mcp_server::browser::BrowserSessionManager;
use jsre_mcp_server::budget::TokenBudget;
use jsre_mcp_server::cache::UnifiedCacheCoordinator;
use jsre_mcp_server::code_cache::{CodeCache, DEFAULT_MAX_SIZE_BYTES};
use jsre_mcp_server::config::BrowserLaunchConfig;
use jsre_mcp_server::detail_store::DetailStore;
use jsre_mcp_server::tools::{build_registry, ToolContext};

fn make_context() -> Arc<ToolContext> {
    let browser = Arc::new(BrowserSessionManager::new(BrowserLaunchConfig::default()));
    let budget = Arc::new(TokenBudget::new());
    let details = Arc::new(DetailStore::new());
    let caches = Arc::new(UnifiedCacheCoordinator::new());
    let cache_dir = tempfile::tempdir().expect("tempdir").into_path();
    let code_cache = Arc::new(CodeCache::new(
        cache_dir,
        std::time::Duration::from_secs(3600),
        DEFAULT_MAX_SIZE_BYTES,
        true,
    ));
    let llm = Arc::new(FakeLlmProvider::new(r#"{"tags": []}"#));
    Arc::new(ToolContext::new(
        browser,
        budget,
        details,
        caches,
        code_cache,
        llm,
        "test-server".into(),
        "0.0.0".into(),
    ))
}

#[tokio::test]
async fn get_server_info_reports_name_and_version_without_a_live_browser() {
    let ctx = make_context();
    let registry = build_registry();
    let result = registry
        .dispatch(ctx, "get_server_info", serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(result["name"], "test-server");
    assert_eq!(result["version"], "0.0.0");
    assert_eq!(result["browser"]["browser_active"], false);
}

#[tokio::test]
async fn unknown_tool_name_dispatches_to_an_invalid_argument_error() {
    let ctx = make_context();
    let registry = build_registry();
    let err = registry
        .dispatch(ctx, "not_a_real_tool", serde_json::json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "invalid_argument");
}

#[tokio::test]
async fn oversized_detail_store_payload_round_trips_through_get_detailed_data() {
    let ctx = make_context();
    let big = serde_json::json!({ "payload": "x".repeat(200_000) });
    let handle = ctx.smart_handle(big.clone()).await.unwrap();
    let detail_id = handle["detailId"].as_str().expect("oversized payload should externalize");

    let registry = build_registry();
    let retrieved = registry
        .dispatch(ctx.clone(), "get_detailed_data", serde_json::json!({ "detailId": detail_id }))
        .await
        .unwrap();
    assert_eq!(retrieved, big);

    registry
        .dispatch(ctx.clone(), "clear_detail_store", serde_json::json!({}))
        .await
        .unwrap();
    let after_clear = registry
        .dispatch(ctx, "get_detailed_data", serde_json::json!({ "detailId": detail_id }))
        .await;
    assert!(after_clear.is_err());
}

#[tokio::test]
async fn token_budget_crosses_ninety_percent_and_manual_cleanup_resets_it() {
    let ctx = make_context();
    // 90% of 200_000 tokens = 180_000 tokens = 720_000 bytes of combined JSON.
    let (warnings, should_cleanup) = ctx.budget.record_call("big_call", 0, 720_000).await;
    assert!(should_cleanup);
    assert!(!warnings.is_empty());

    let registry = build_registry();
    registry
        .dispatch(ctx.clone(), "manual_cleanup", serde_json::json!({}))
        .await
        .unwrap();

    // The record is only microseconds old, so the 5-minute retention window
    // keeps it in history; cleanup's job here is to recompute current_usage
    // from what survives rather than to empty the history outright.
    let stats = registry
        .dispatch(ctx, "get_budget_stats", serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(stats["history_len"], 1);
    assert_eq!(stats["current_usage"], 180_000);
}

#[tokio::test]
async fn hook_records_ingest_and_clear_round_trip() {
    let ctx = make_context();
    let registry = build_registry();

    registry
        .dispatch(
            ctx.clone(),
            "ai_hook_ingest_records",
            serde_json::json!({
                "hookId": "hook-1",
                "records": [{"args": [1, 2]}, {"args": [3]}],
            }),
        )
        .await
        .unwrap();

    let records = registry
        .dispatch(ctx.clone(), "ai_hook_get_records", serde_json::json!({ "hookId": "hook-1" }))
        .await
        .unwrap();
    assert_eq!(records["records"].as_array().unwrap().len(), 2);

    registry
        .dispatch(ctx.clone(), "ai_hook_clear_records", serde_json::json!({ "hookId": "hook-1" }))
        .await
        .unwrap();
    let after_clear = registry
        .dispatch(ctx, "ai_hook_get_records", serde_json::json!({ "hookId": "hook-1" }))
        .await
        .unwrap();
    assert!(after_clear["records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn analysis_detect_obfuscation_flags_packer_without_depending_on_the_llm() {
    let ctx = make_context();
    let registry = build_registry();
    let code = "eval(function(p,a,c,k,e,d){return p}('packed', 1, 1, []))";
    let result = registry
        .dispatch(ctx, "analysis_detect_obfuscation", serde_json::json!({ "code": code }))
        .await
        .unwrap();
    let tags = result["tags"].as_array().unwrap();
    assert!(tags.iter().any(|t| t == "packer"));
}
