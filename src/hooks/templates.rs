//! Static JS assets for each hook type, with positional-token substitution.

use super::{HookAction, HookType};
use crate::error::Result;

const FUNCTION: &str = include_str!("../../assets/hooks/function.js");
const XHR: &str = include_str!("../../assets/hooks/xhr.js");
const FETCH: &str = include_str!("../../assets/hooks/fetch.js");
const WEBSOCKET: &str = include_str!("../../assets/hooks/websocket.js");
const LOCALSTORAGE: &str = include_str!("../../assets/hooks/localstorage.js");
const COOKIE: &str = include_str!("../../assets/hooks/cookie.js");
const EVAL: &str = include_str!("../../assets/hooks/eval.js");
const OBJECT_METHOD: &str = include_str!("../../assets/hooks/object_method.js");
pub const ANTI_DEBUG_BYPASS: &str = include_str!("../../assets/hooks/anti_debug_bypass.js");

pub struct RenderParams<'a> {
    pub hook_id: &'a str,
    pub target: &'a str,
    pub action: HookAction,
    pub custom_code: &'a str,
    pub max_calls: u64,
    pub min_interval_ms: u64,
    pub performance: bool,
}

pub fn render(hook_type: HookType, params: &RenderParams<'_>) -> Result<String> {
    let template = match hook_type {
        HookType::Function => FUNCTION,
        HookType::Xhr => XHR,
        HookType::Fetch => FETCH,
        HookType::Websocket => WEBSOCKET,
        HookType::Localstorage => LOCALSTORAGE,
        HookType::Cookie => COOKIE,
        HookType::Eval => EVAL,
        HookType::ObjectMethod => OBJECT_METHOD,
    };

    let action_str = match params.action {
        HookAction::Log => "log",
        HookAction::Block => "block",
        HookAction::Modify => "modify",
    };

    let mut script = template.to_string();
    script = script.replace("__HOOK_ID__", &escape(params.hook_id));
    script = script.replace("__TARGET__", &escape(params.target));
    script = script.replace("__ACTION__", action_str);
    script = script.replace("__MAX_CALLS__", &params.max_calls.to_string());
    script = script.replace("__MIN_INTERVAL_MS__", &params.min_interval_ms.to_string());
    script = script.replace("__PERFORMANCE__", if params.performance { "true" } else { "false" });
    script = script.replace("__CUSTOM_CODE__", params.custom_code);
    Ok(script)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_hook_type_without_leftover_placeholders() {
        for hook_type in [
            HookType::Function,
            HookType::Xhr,
            HookType::Fetch,
            HookType::Websocket,
            HookType::Localstorage,
            HookType::Cookie,
            HookType::Eval,
            HookType::ObjectMethod,
        ] {
            let params = RenderParams {
                hook_id: "h1",
                target: "window.decrypt",
                action: HookAction::Log,
                custom_code: "",
                max_calls: 100,
                min_interval_ms: 0,
                performance: true,
            };
            let script = render(hook_type, &params).unwrap();
            assert!(!script.contains("__HOOK_ID__"));
            assert!(!script.contains("__TARGET__"));
            assert!(!script.contains("__ACTION__"));
            assert!(!script.contains("__MAX_CALLS__"));
            assert!(!script.contains("__MIN_INTERVAL_MS__"));
            assert!(!script.contains("__PERFORMANCE__"));
        }
    }
}
