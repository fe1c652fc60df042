use std::sync::Arc;

use serde_json::{json, Value};

use super::util::{opt_str, opt_usize, require_str};
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("get_budget_stats", |ctx: Arc<ToolContext>, _args: Value| async move {
        Ok(json!(ctx.budget.stats().await))
    });

    reg.add("get_detailed_data", |ctx: Arc<ToolContext>, args: Value| async move {
        let detail_id = require_str(&args, "detailId")?;
        let path = opt_str(&args, "path");
        ctx.details.retrieve(detail_id, path).await
    });

    reg.add("get_cache_stats", |ctx: Arc<ToolContext>, _args: Value| async move {
        Ok(json!(ctx.caches.global_stats().await))
    });

    reg.add("clear_detail_store", |ctx: Arc<ToolContext>, _args: Value| async move {
        ctx.details.clear().await;
        Ok(json!({ "cleared": true }))
    });

    reg.add("manual_cleanup", |ctx: Arc<ToolContext>, args: Value| async move {
        ctx.budget.manual_cleanup(&ctx.details, &ctx.caches).await;
        let target_bytes = opt_usize(&args, "targetBytes", 0);
        let freed = if target_bytes > 0 {
            ctx.caches.smart_cleanup(target_bytes).await
        } else {
            0
        };
        Ok(json!({ "budget": ctx.budget.stats().await, "freedBytes": freed }))
    });

    reg.add("reset_token_budget", |ctx: Arc<ToolContext>, _args: Value| async move {
        ctx.budget.reset().await;
        Ok(json!(ctx.budget.stats().await))
    });
}
