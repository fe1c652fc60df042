use std::sync::Arc;

use serde_json::{json, Value};

use super::util::require_str;
use crate::console::ConsoleFilter;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

fn filter_from_args(args: &Value) -> ConsoleFilter {
    ConsoleFilter {
        message_type: args.get("type").and_then(Value::as_str).map(str::to_string),
        url: args.get("url").and_then(Value::as_str).map(str::to_string),
        since: args.get("since").and_then(Value::as_f64),
        limit: args.get("limit").and_then(Value::as_u64).map(|v| v as usize),
    }
}

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("console_execute", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.console.ensure_enabled().await?;
        let expression = require_str(&args, "expression")?;
        let value = subsystems.console.execute(expression).await?;
        Ok(json!({ "result": value }))
    });

    reg.add("console_get_messages", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let filter = filter_from_args(&args);
        ctx.smart_handle(json!({ "messages": subsystems.console.messages(filter).await }))
            .await
    });

    reg.add(
        "console_get_exceptions",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let filter = filter_from_args(&args);
            ctx.smart_handle(json!({ "exceptions": subsystems.console.exceptions(filter).await }))
                .await
        },
    );

    reg.add(
        "console_enable_dynamic_script_monitoring",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            subsystems.console.ensure_enabled().await?;
            let value = subsystems
                .console
                .inject("enableDynamicScriptMonitoring", &[])
                .await?;
            Ok(json!({ "result": value }))
        },
    );

    reg.add(
        "console_inject_xhr_interceptor",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            subsystems.console.ensure_enabled().await?;
            let value = subsystems.console.inject("injectXHRInterceptor", &[]).await?;
            Ok(json!({ "result": value }))
        },
    );

    reg.add(
        "console_inject_fetch_interceptor",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            subsystems.console.ensure_enabled().await?;
            let value = subsystems.console.inject("injectFetchInterceptor", &[]).await?;
            Ok(json!({ "result": value }))
        },
    );

    reg.add(
        "console_inject_function_tracer",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            subsystems.console.ensure_enabled().await?;
            let name = require_str(&args, "name")?;
            let value = subsystems
                .console
                .inject("injectFunctionTracer", &[name])
                .await?;
            Ok(json!({ "result": value }))
        },
    );

    reg.add(
        "console_inject_property_watcher",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            subsystems.console.ensure_enabled().await?;
            let path = require_str(&args, "path")?;
            let name = require_str(&args, "name")?;
            let value = subsystems
                .console
                .inject("injectPropertyWatcher", &[path, name])
                .await?;
            Ok(json!({ "result": value }))
        },
    );
}
