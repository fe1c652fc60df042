use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::util::{opt_i64, opt_str, opt_u64, require_i64, require_str};
use crate::debugger::event_breakpoints::EventBundle;
use crate::debugger::session_io::{self, SessionSnapshot};
use crate::debugger::{BreakpointLocation, GetScopeVariablesOptions, PauseOnExceptions};
use crate::error::{Result, ServerError};
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

fn parse_pause_on_exceptions(raw: &str) -> Result<PauseOnExceptions> {
    match raw {
        "none" => Ok(PauseOnExceptions::None),
        "uncaught" => Ok(PauseOnExceptions::Uncaught),
        "all" => Ok(PauseOnExceptions::All),
        other => Err(ServerError::InvalidArgument(format!(
            "pauseOnExceptions must be one of none/uncaught/all, got `{other}`"
        ))),
    }
}

fn parse_event_bundle(raw: &str) -> Result<EventBundle> {
    match raw {
        "mouse" => Ok(EventBundle::Mouse),
        "keyboard" => Ok(EventBundle::Keyboard),
        "timer" => Ok(EventBundle::Timer),
        "websocket" => Ok(EventBundle::WebSocket),
        other => Err(ServerError::InvalidArgument(format!(
            "unknown event bundle `{other}`"
        ))),
    }
}

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("debugger_enable", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.debugger.enable().await?;
        Ok(json!({ "state": subsystems.debugger.state().await }))
    });

    reg.add("debugger_disable", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.debugger.disable().await?;
        Ok(json!({ "state": subsystems.debugger.state().await }))
    });

    reg.add("debugger_pause", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.debugger.pause().await?;
        Ok(json!({ "state": subsystems.debugger.state().await }))
    });

    reg.add("debugger_resume", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.debugger.resume().await?;
        Ok(json!({ "state": subsystems.debugger.state().await }))
    });

    reg.add("debugger_step_into", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.debugger.step_into().await?;
        Ok(json!({ "state": subsystems.debugger.state().await }))
    });

    reg.add("debugger_step_over", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.debugger.step_over().await?;
        Ok(json!({ "state": subsystems.debugger.state().await }))
    });

    reg.add("debugger_step_out", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.debugger.step_out().await?;
        Ok(json!({ "state": subsystems.debugger.state().await }))
    });

    reg.add(
        "debugger_evaluate_on_call_frame",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let call_frame_id = require_str(&args, "callFrameId")?;
            let expression = require_str(&args, "expression")?;
            let result = subsystems
                .debugger
                .evaluate_on_call_frame(call_frame_id, expression)
                .await?;
            Ok(json!({ "result": result }))
        },
    );

    reg.add(
        "debugger_get_scope_variables",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let mut opts = GetScopeVariablesOptions::defaults();
            opts.call_frame_id = opt_str(&args, "callFrameId").map(str::to_string);
            if let Some(v) = args.get("includeObjectProperties").and_then(Value::as_bool) {
                opts.include_object_properties = v;
            }
            if let Some(v) = args.get("maxDepth").and_then(Value::as_u64) {
                opts.max_depth = v as usize;
            }
            if let Some(v) = args.get("skipErrors").and_then(Value::as_bool) {
                opts.skip_errors = v;
            }
            let result = subsystems.debugger.get_scope_variables(opts).await?;
            ctx.smart_handle(json!(result)).await
        },
    );

    reg.add(
        "debugger_wait_for_paused",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let timeout_ms = opt_u64(&args, "timeoutMs").unwrap_or(30_000);
            let state = subsystems
                .debugger
                .wait_for_paused(Duration::from_millis(timeout_ms))
                .await?;
            Ok(json!(state))
        },
    );

    reg.add(
        "debugger_export_session",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            Ok(json!(subsystems.debugger.export_session().await))
        },
    );

    reg.add(
        "debugger_import_session",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let snapshot: SessionSnapshot = serde_json::from_value(
                args.get("snapshot")
                    .cloned()
                    .ok_or_else(|| ServerError::InvalidArgument("snapshot required".into()))?,
            )?;
            subsystems.debugger.import_session(snapshot).await?;
            Ok(json!({ "imported": true }))
        },
    );

    reg.add(
        "debugger_save_session",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let snapshot = subsystems.debugger.export_session().await;
            let path = session_io::save_session(&snapshot, opt_str(&args, "path")).await?;
            Ok(json!({ "path": path }))
        },
    );

    reg.add(
        "debugger_load_session",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let path = require_str(&args, "path")?;
            let snapshot = session_io::load_session_from_file(path).await?;
            subsystems.debugger.import_session(snapshot.clone()).await?;
            Ok(json!(snapshot))
        },
    );

    reg.add(
        "debugger_list_saved_sessions",
        |_ctx: Arc<ToolContext>, _args: Value| async move {
            let sessions = session_io::list_saved_sessions().await?;
            Ok(json!({ "sessions": sessions }))
        },
    );

    // --- breakpoint_* ---
    reg.add("breakpoint_set", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let location = BreakpointLocation {
            script_id: opt_str(&args, "scriptId").map(str::to_string),
            url: opt_str(&args, "url").map(str::to_string),
            line_number: require_i64(&args, "lineNumber")?,
            column_number: opt_i64(&args, "columnNumber"),
        };
        let condition = opt_str(&args, "condition").map(str::to_string);
        let bp = subsystems.debugger.set_breakpoint(location, condition).await?;
        Ok(json!(bp))
    });

    reg.add("breakpoint_remove", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let id = require_str(&args, "breakpointId")?;
        subsystems.debugger.remove_breakpoint(id).await?;
        Ok(json!({ "removed": true }))
    });

    reg.add("breakpoint_list", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        Ok(json!({ "breakpoints": subsystems.debugger.list_breakpoints().await }))
    });

    reg.add(
        "breakpoint_clear_all",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            subsystems.debugger.clear_all_breakpoints().await?;
            Ok(json!({ "cleared": true }))
        },
    );

    reg.add(
        "breakpoint_set_pause_on_exceptions",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let mode = parse_pause_on_exceptions(require_str(&args, "state")?)?;
            subsystems.debugger.set_pause_on_exceptions(mode).await?;
            Ok(json!({ "state": mode }))
        },
    );

    reg.add(
        "breakpoint_get_pause_on_exceptions",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            Ok(json!({ "state": subsystems.debugger.pause_on_exceptions_state().await }))
        },
    );

    // --- xhr_* ---
    reg.add("xhr_set_breakpoint", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let pattern = require_str(&args, "urlPattern")?;
        let bp = subsystems.debugger.xhr_breakpoints.set(pattern).await?;
        Ok(json!(bp))
    });

    reg.add(
        "xhr_remove_breakpoint",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let id = require_str(&args, "id")?;
            subsystems.debugger.xhr_breakpoints.remove(id).await?;
            Ok(json!({ "removed": true }))
        },
    );

    reg.add(
        "xhr_list_breakpoints",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            Ok(json!({ "breakpoints": subsystems.debugger.xhr_breakpoints.list().await }))
        },
    );

    // --- event_* ---
    reg.add(
        "event_set_breakpoint",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let name = require_str(&args, "eventName")?;
            subsystems.debugger.event_breakpoints.set(name).await?;
            Ok(json!({ "set": true }))
        },
    );

    reg.add(
        "event_remove_breakpoint",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            let name = require_str(&args, "eventName")?;
            subsystems.debugger.event_breakpoints.remove(name).await?;
            Ok(json!({ "removed": true }))
        },
    );

    reg.add("event_set_bundle", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let bundle = parse_event_bundle(require_str(&args, "bundle")?)?;
        subsystems.debugger.event_breakpoints.set_bundle(bundle).await?;
        Ok(json!({ "applied": bundle.event_names() }))
    });

    reg.add(
        "event_list_breakpoints",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            Ok(json!({ "active": subsystems.debugger.event_breakpoints.active().await }))
        },
    );

    // --- watch_* ---
    reg.add("watch_add", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let name = require_str(&args, "name")?;
        let expression = require_str(&args, "expression")?;
        subsystems.debugger.watch.add(name, expression).await;
        Ok(json!({ "added": true }))
    });

    reg.add("watch_remove", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let name = require_str(&args, "name")?;
        subsystems.debugger.watch.remove(name).await;
        Ok(json!({ "removed": true }))
    });

    reg.add("watch_list", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        Ok(json!({ "watches": subsystems.debugger.watch.list().await }))
    });

    reg.add("watch_evaluate_all", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let call_frame_id = opt_str(&args, "callFrameId");
        let results = subsystems.debugger.watch.evaluate_all(call_frame_id).await;
        Ok(json!({ "results": results }))
    });

    // --- blackbox_* ---
    reg.add("blackbox_add", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let pattern = require_str(&args, "pattern")?;
        subsystems.debugger.blackbox.add(pattern).await?;
        Ok(json!({ "added": true }))
    });

    reg.add("blackbox_remove", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let pattern = require_str(&args, "pattern")?;
        subsystems.debugger.blackbox.remove(pattern).await?;
        Ok(json!({ "removed": true }))
    });

    reg.add("blackbox_list", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        Ok(json!({ "patterns": subsystems.debugger.blackbox.patterns().await }))
    });

    reg.add(
        "blackbox_apply_common_library_bundle",
        |ctx: Arc<ToolContext>, _args: Value| async move {
            let subsystems = ctx.ensure_session_subsystems().await?;
            subsystems.debugger.blackbox.apply_common_library_bundle().await?;
            Ok(json!({ "patterns": subsystems.debugger.blackbox.patterns().await }))
        },
    );
}
