use std::sync::Arc;

use serde_json::{json, Value};

use super::util::{opt_bool, opt_str, require_str};
use crate::analysis;
use crate::tools::context::ToolContext;
use crate::tools::registry::ToolRegistryBuilder;

pub fn register(reg: &mut ToolRegistryBuilder) {
    reg.add("analysis_deobfuscate", |ctx: Arc<ToolContext>, args: Value| async move {
        let code = require_str(&args, "code")?;
        let aggressive = opt_bool(&args, "aggressive", false);
        let result = analysis::deobfuscate(ctx.llm.as_ref(), code, aggressive).await?;
        ctx.smart_handle(json!(result)).await
    });

    reg.add(
        "analysis_detect_obfuscation",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let code = require_str(&args, "code")?;
            let tags = analysis::detect_obfuscation(ctx.llm.as_ref(), code).await?;
            Ok(json!({ "tags": tags }))
        },
    );

    reg.add("analysis_detect_crypto", |ctx: Arc<ToolContext>, args: Value| async move {
        let code = require_str(&args, "code")?;
        let result = analysis::detect_crypto(ctx.llm.as_ref(), code).await?;
        Ok(json!(result))
    });

    reg.add(
        "analysis_understand_code",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let code = require_str(&args, "code")?;
            let focus = opt_str(&args, "focus");
            let result = analysis::understand_code(ctx.llm.as_ref(), code, focus).await?;
            ctx.smart_handle(json!(result)).await
        },
    );

    reg.add(
        "analysis_environment_emulator",
        |ctx: Arc<ToolContext>, args: Value| async move {
            let code = require_str(&args, "code")?;
            let runtime = require_str(&args, "runtime")?;
            let browser_type = opt_str(&args, "browserType");
            let result =
                analysis::environment_emulator(ctx.llm.as_ref(), code, runtime, browser_type)
                    .await?;
            ctx.smart_handle(json!(result)).await
        },
    );
}
