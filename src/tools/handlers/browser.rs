use std::sync::Arc;

use serde_json::{json, Value};

use super::util::require_str;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("browser_launch", |ctx: Arc<ToolContext>, _args: Value| async move {
        ctx.browser.get_active_page().await?;
        Ok(json!(ctx.browser.status().await?))
    });

    reg.add("browser_status", |ctx: Arc<ToolContext>, _args: Value| async move {
        Ok(json!(ctx.browser.status().await?))
    });

    reg.add("browser_navigate", |ctx: Arc<ToolContext>, args: Value| async move {
        let url = require_str(&args, "url")?.to_string();
        let final_url = ctx.browser.navigate(&url).await?;
        ctx.reset_session_subsystems().await;
        Ok(json!({ "url": final_url }))
    });

    reg.add("browser_close", |ctx: Arc<ToolContext>, _args: Value| async move {
        ctx.browser.close().await?;
        ctx.reset_session_subsystems().await;
        Ok(json!({ "closed": true }))
    });

    reg.add("get_server_info", |ctx: Arc<ToolContext>, _args: Value| async move {
        let status = ctx.browser.status().await?;
        Ok(json!({
            "name": ctx.server_name,
            "version": ctx.server_version,
            "llmProvider": ctx.llm.name(),
            "browser": status,
        }))
    });
}
