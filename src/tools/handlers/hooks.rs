use std::sync::Arc;

use serde_json::{json, Value};

use super::util::require_str;
use crate::hooks::HookOptions;
use crate::error::ServerError;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("ai_hook_generate", |ctx: Arc<ToolContext>, args: Value| async move {
        let options: HookOptions = serde_json::from_value(args)
            .map_err(|e| ServerError::InvalidArgument(format!("invalid hook options: {e}")))?;
        let hook = ctx.hooks.generate(options)?;
        Ok(json!(hook))
    });

    reg.add(
        "ai_hook_anti_debug_bypass",
        |ctx: Arc<ToolContext>, _args: Value| async move { Ok(json!(ctx.hooks.anti_debug_bypass())) },
    );

    reg.add("ai_hook_get_records", |ctx: Arc<ToolContext>, args: Value| async move {
        let hook_id = require_str(&args, "hookId")?;
        Ok(json!({ "records": ctx.hook_records.get(hook_id).await }))
    });

    reg.add(
        "ai_hook_ingest_records",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let hook_id = require_str(&args, "hookId")?.to_string();
            let records = args
                .get("records")
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| ServerError::InvalidArgument("records must be an array".into()))?;
            ctx.hook_records.ingest(&hook_id, records).await;
            Ok(json!({ "ingested": true }))
        },
    );

    reg.add("ai_hook_clear_records", |ctx: Arc<ToolContext>, args: Value| async move {
        let hook_id = require_str(&args, "hookId")?;
        ctx.hook_records.clear(hook_id).await;
        Ok(json!({ "cleared": true }))
    });

    reg.add(
        "ai_hook_clear_all_records",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            ctx.hook_records.clear_all().await;
            Ok(json!({ "cleared": true }))
        },
    );
}
