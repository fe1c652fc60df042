//! Loads the in-page injector scripts as static assets and substitutes
//! their positional `__ARGn__` placeholders, rather than building up JS
//! via ad-hoc string concatenation.

use crate::error::{Result, ServerError};

const ENABLE_DYNAMIC_SCRIPT_MONITORING: &str =
    include_str!("../../assets/console/enable_dynamic_script_monitoring.js");
const INJECT_XHR_INTERCEPTOR: &str = include_str!("../../assets/console/inject_xhr_interceptor.js");
const INJECT_FETCH_INTERCEPTOR: &str =
    include_str!("../../assets/console/inject_fetch_interceptor.js");
const INJECT_FUNCTION_TRACER: &str = include_str!("../../assets/console/inject_function_tracer.js");
const INJECT_PROPERTY_WATCHER: &str =
    include_str!("../../assets/console/inject_property_watcher.js");

pub fn render(name: &str, args: &[&str]) -> Result<String> {
    let template = match name {
        "enableDynamicScriptMonitoring" => ENABLE_DYNAMIC_SCRIPT_MONITORING,
        "injectXHRInterceptor" => INJECT_XHR_INTERCEPTOR,
        "injectFetchInterceptor" => INJECT_FETCH_INTERCEPTOR,
        "injectFunctionTracer" => INJECT_FUNCTION_TRACER,
        "injectPropertyWatcher" => INJECT_PROPERTY_WATCHER,
        other => return Err(ServerError::InvalidArgument(format!("unknown injector `{other}`"))),
    };

    let mut script = template.to_string();
    for (idx, arg) in args.iter().enumerate() {
        let placeholder = format!("__ARG{idx}__");
        let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
        script = script.replace(&placeholder, &escaped);
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_injector() {
        let script = render("enableDynamicScriptMonitoring", &[]).unwrap();
        assert!(script.contains("__enableDynamicScriptMonitoringInstalled"));
    }

    #[test]
    fn substitutes_positional_args() {
        let script = render("injectFunctionTracer", &["decrypt"]).unwrap();
        assert!(script.contains("decrypt"));
        assert!(!script.contains("__ARG0__"));
    }

    #[test]
    fn unknown_injector_is_invalid_argument() {
        let err = render("doesNotExist", &[]).unwrap_err();
        assert_eq!(err.category(), "invalid_argument");
    }
}
