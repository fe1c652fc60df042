use std::sync::Arc;

use serde_json::{json, Value};

use super::util::{opt_bool, opt_str, opt_usize, require_str};
use crate::code_cache::{hash_files, CodeArtifact, CodeFile};
use crate::script_catalog::function_tree::ExtractOptions;
use crate::script_catalog::search::SearchOptions;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("script_get_source", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let target = opt_str(&args, "scriptId")
            .or_else(|| opt_str(&args, "urlGlob"))
            .ok_or_else(|| {
                crate::error::ServerError::InvalidArgument("scriptId or urlGlob required".into())
            })?;
        let script = subsystems.scripts.get_script_source(target).await?;
        Ok(json!(script))
    });

    reg.add("script_search_in_scripts", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let keyword = require_str(&args, "keyword")?;
        let opts = SearchOptions {
            is_regex: opt_bool(&args, "isRegex", false),
            case_sensitive: opt_bool(&args, "caseSensitive", false),
            context_lines: opt_usize(&args, "contextLines", 3),
            max_matches: opt_usize(&args, "maxMatches", 100),
        };
        let matches = subsystems.scripts.search(keyword, opts).await?;
        ctx.smart_handle(json!({ "matches": matches })).await
    });

    reg.add("script_extract_function_tree", |ctx: Arc<ToolContext>, args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let script_id = require_str(&args, "scriptId")?;
        let function_name = require_str(&args, "functionName")?;
        let mut opts = ExtractOptions::default();
        if let Some(v) = args.get("maxDepth").and_then(Value::as_u64) {
            opts.max_depth = v as usize;
        }
        if let Some(v) = args.get("maxSize").and_then(Value::as_u64) {
            opts.max_size = v as usize;
        }
        opts.include_comments = opt_bool(&args, "includeComments", true);
        let tree = subsystems
            .scripts
            .extract_function_tree(script_id, function_name, opts)
            .await?;
        ctx.smart_handle(json!(tree)).await
    });

    reg.add("script_list", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        let scripts = subsystems.scripts.list_scripts().await;
        ctx.smart_handle(json!({ "scripts": scripts })).await
    });

    reg.add("script_clear", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        subsystems.scripts.clear().await;
        Ok(json!({ "cleared": true }))
    });

    reg.add("script_get_stats", |ctx: Arc<ToolContext>, _args: Value| async move {
        let subsystems = ctx.ensure_session_subsystems().await?;
        Ok(json!(subsystems.scripts.stats().await))
    });

    reg.add("collect_code", |ctx: Arc<ToolContext>, args: Value| async move {
        let url = require_str(&args, "url")?;
        let force_refresh = opt_bool(&args, "forceRefresh", false);

        let smart_mode = opt_str(&args, "smartMode");
        let return_summary_only = opt_bool(&args, "returnSummaryOnly", false);
        // Deprecated `returnSummaryOnly` still accepted, but explicit
        // `smartMode` wins when both are set.
        let summary_only = match smart_mode {
            Some(mode) => mode == "summary",
            None => return_summary_only,
        };

        let artifact = if !force_refresh {
            ctx.code_cache.get(url).await?
        } else {
            None
        };

        let artifact = match artifact {
            Some(artifact) => artifact,
            None => {
                let subsystems = ctx.ensure_session_subsystems().await?;
                let started = std::time::Instant::now();

                let candidates: Vec<String> = subsystems
                    .scripts
                    .list_scripts()
                    .await
                    .into_iter()
                    .filter(|s| s.url.contains(url))
                    .map(|s| s.script_id)
                    .collect();
                if candidates.is_empty() {
                    return Err(crate::error::ServerError::NotFound(format!(
                        "no parsed scripts matching `{url}`"
                    )));
                }

                let mut files = Vec::with_capacity(candidates.len());
                for script_id in candidates {
                    let script = subsystems.scripts.get_script_source(&script_id).await?;
                    if let Some(source) = script.source {
                        files.push(CodeFile { url: script.url, content: source });
                    }
                }

                let total_size = files.iter().map(|f| f.content.len()).sum();
                let hash = hash_files(&files);
                let artifact = CodeArtifact {
                    url: url.to_string(),
                    files,
                    total_size,
                    collect_time: started.elapsed().as_millis() as u64,
                    timestamp: chrono::Utc::now(),
                    hash,
                };
                ctx.code_cache.put(&artifact).await?;
                artifact
            }
        };

        let shaped = if summary_only {
            json!(artifact.summarize())
        } else {
            json!(artifact)
        };
        ctx.smart_handle(shaped).await
    });
}
