//! Startup configuration, read once from the environment. Mirrors
//! `code-browser::config::BrowserConfig`'s shape: a plain struct with a
//! `Default` impl and an `from_env` constructor, no external config crate.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BrowserLaunchConfig {
    pub headless: bool,
    pub timeout: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserLaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout: Duration::from_millis(30_000),
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Anthropic,
    None,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub default_provider: LlmProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: std::path::PathBuf,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub browser: BrowserLaunchConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub max_concurrent_analysis: usize,
    pub max_code_size_bytes: u64,
    pub log_level: String,
    pub server_name: String,
    pub server_version: String,
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Reads every environment variable named in the external-interfaces
    /// section exactly once, at startup.
    pub fn from_env() -> Self {
        let default_provider = match env_str("DEFAULT_LLM_PROVIDER", "").as_str() {
            "openai" => LlmProviderKind::OpenAi,
            "anthropic" => LlmProviderKind::Anthropic,
            _ => LlmProviderKind::None,
        };

        let cache_dir = env_opt("CACHE_DIR")
            .map(std::path::PathBuf::from)
            .or_else(|| dirs::cache_dir().map(|d| d.join("jsre-mcp-server")))
            .unwrap_or_else(|| std::env::temp_dir().join("jsre-mcp-cache"));

        Self {
            browser: BrowserLaunchConfig {
                headless: env_bool("PUPPETEER_HEADLESS", true),
                timeout: Duration::from_millis(env_u64("PUPPETEER_TIMEOUT", 30_000)),
                ..BrowserLaunchConfig::default()
            },
            llm: LlmConfig {
                default_provider,
                openai_api_key: env_opt("OPENAI_API_KEY"),
                openai_model: env_str("OPENAI_MODEL", "gpt-4o-mini"),
                openai_base_url: env_str("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
                anthropic_model: env_str("ANTHROPIC_MODEL", "claude-3-5-sonnet-latest"),
            },
            cache: CacheConfig {
                enabled: env_bool("ENABLE_CACHE", true),
                dir: cache_dir,
                ttl: Duration::from_secs(env_u64("CACHE_TTL", 3600)),
            },
            max_concurrent_analysis: env_u64("MAX_CONCURRENT_ANALYSIS", 2) as usize,
            max_code_size_bytes: env_u64("MAX_CODE_SIZE_MB", 10) * 1024 * 1024,
            log_level: env_str("LOG_LEVEL", "info"),
            server_name: env_str("MCP_SERVER_NAME", "jsre-mcp-server"),
            server_version: env_str("MCP_SERVER_VERSION", env!("CARGO_PKG_VERSION")),
        }
    }
}
