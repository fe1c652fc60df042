use std::sync::Arc;

use serde_json::{json, Value};

use super::util::require_str;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("network_enable", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.network.enable().await?;
        Ok(json!({ "enabled": true }))
    });

    reg.add("network_disable", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.network.disable().await?;
        Ok(json!({ "enabled": false }))
    });

    reg.add("network_get_requests", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        ctx.smart_handle(json!({ "requests": subsystems.network.requests().await }))
            .await
    });

    reg.add("network_get_responses", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        ctx.smart_handle(json!({ "responses": subsystems.network.responses().await }))
            .await
    });

    reg.add(
        "network_get_response_body",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let request_id = require_str(&args, "requestId")?;
            let body = subsystems.network.get_response_body(request_id).await?;
            ctx.smart_handle(json!(body)).await
        },
    );

    reg.add(
        "network_get_all_javascript_responses",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let responses = subsystems.network.get_all_javascript_responses().await?;
            ctx.smart_handle(json!({ "responses": responses })).await
        },
    );
}
