//! Process entry point: wires the subsystems together, serves MCP over
//! stdio, and shuts the browser down cleanly on SIGINT/SIGTERM per spec §6.

use std::sync::Arc;

use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

use jsre_mcp_server::analysis::{AnthropicProvider, LLMProvider, NullLlmProvider, OpenAiProvider};
use jsre_mcp_server::browser::BrowserSessionManager;
use jsre_mcp_server::budget::TokenBudget;
use jsre_mcp_server::cache::UnifiedCacheCoordinator;
use jsre_mcp_server::code_cache::{CodeCache, DEFAULT_MAX_SIZE_BYTES};
use jsre_mcp_server::config::{LlmProviderKind, ServerConfig};
use jsre_mcp_server::detail_store::DetailStore;
use jsre_mcp_server::tools::{build_registry, ToolContext};
use jsre_mcp_server::transport::McpTransport;

fn build_llm(config: &ServerConfig) -> Arc<dyn LLMProvider> {
    match config.llm.default_provider {
        LlmProviderKind::OpenAi => match &config.llm.openai_api_key {
            Some(key) => Arc::new(OpenAiProvider::new(
                key.clone(),
                config.llm.openai_model.clone(),
                Some(config.llm.openai_base_url.clone()),
            )),
            None => {
                tracing::warn!("DEFAULT_LLM_PROVIDER=openai but OPENAI_API_KEY is unset");
                Arc::new(NullLlmProvider::default())
            }
        },
        LlmProviderKind::Anthropic => match &config.llm.anthropic_api_key {
            Some(key) => {
                Arc::new(AnthropicProvider::new(key.clone(), config.llm.anthropic_model.clone()))
            }
            None => {
                tracing::warn!("DEFAULT_LLM_PROVIDER=anthropic but ANTHROPIC_API_KEY is unset");
                Arc::new(NullLlmProvider::default())
            }
        },
        LlmProviderKind::None => Arc::new(NullLlmProvider::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // Log to stderr: stdout is the MCP stdio transport's wire.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();

    let browser = Arc::new(BrowserSessionManager::new(config.browser.clone()));
    let budget = Arc::new(TokenBudget::new());
    let details = Arc::new(DetailStore::new());
    let caches = Arc::new(UnifiedCacheCoordinator::new());
    let code_cache = Arc::new(CodeCache::new(
        config.cache.dir.clone(),
        config.cache.ttl,
        DEFAULT_MAX_SIZE_BYTES,
        config.cache.enabled,
    ));
    caches.register(code_cache.clone()).await;
    let llm = build_llm(&config);

    let ctx = Arc::new(ToolContext::new(
        browser.clone(),
        budget,
        details,
        caches,
        code_cache,
        llm,
        config.server_name.clone(),
        config.server_version.clone(),
    ));
    let registry = build_registry();
    let transport = McpTransport::new(
        ctx,
        registry,
        config.server_name.clone(),
        config.server_version.clone(),
    );

    let service = transport.serve(stdio()).await?;

    tokio::select! {
        result = service.waiting() => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, closing browser");
        }
    }

    if let Err(err) = browser.close().await {
        tracing::warn!(%err, "error closing browser during shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
