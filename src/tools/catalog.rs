//! Static tool catalog (spec §4.A/§6): name, human description, and a
//! JSON-schema-shaped input spec for every tool this server exposes.
//! Namespaced by prefix per the interface list, scoped to the subsystems
//! actually implemented (no `dom_*`/`performance_*`/`captcha_*`/`stealth_*` —
//! those name CDP domains this server does not wire up).

use serde_json::{json, Value};

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn spec(name: &'static str, description: &'static str, input_schema: Value) -> ToolSpec {
    ToolSpec {
        name,
        description,
        input_schema,
    }
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub fn build_catalog() -> Vec<ToolSpec> {
    vec![
        // --- browser_* ---
        spec(
            "browser_launch",
            "Launch the managed Chromium instance if not already running.",
            empty_schema(),
        ),
        spec("browser_status", "Report browser lifecycle and active-page status.", empty_schema()),
        spec(
            "browser_navigate",
            "Navigate the active page to a URL, opening one if none exists yet.",
            json!({
                "type": "object",
                "properties": { "url": { "type": "string" } },
                "required": ["url"],
            }),
        ),
        spec("browser_close", "Close the browser and detach every CDP session.", empty_schema()),
        // --- debugger_* ---
        spec("debugger_enable", "Enable the Debugger domain on the shared debugger session.", empty_schema()),
        spec("debugger_disable", "Disable the Debugger domain and clear all breakpoint/watch state.", empty_schema()),
        spec("debugger_pause", "Pause JS execution at the next statement.", empty_schema()),
        spec("debugger_resume", "Resume execution from a paused state.", empty_schema()),
        spec("debugger_step_into", "Step into the next call while paused.", empty_schema()),
        spec("debugger_step_over", "Step over the next call while paused.", empty_schema()),
        spec("debugger_step_out", "Step out of the current call frame while paused.", empty_schema()),
        spec(
            "debugger_evaluate_on_call_frame",
            "Evaluate an expression in the context of a paused call frame.",
            json!({
                "type": "object",
                "properties": {
                    "callFrameId": { "type": "string" },
                    "expression": { "type": "string" },
                },
                "required": ["callFrameId", "expression"],
            }),
        ),
        spec(
            "debugger_get_scope_variables",
            "Walk a paused call frame's scope chain and return named variables.",
            json!({
                "type": "object",
                "properties": {
                    "callFrameId": { "type": "string" },
                    "includeObjectProperties": { "type": "boolean", "default": false },
                    "maxDepth": { "type": "integer", "default": 1 },
                    "skipErrors": { "type": "boolean", "default": true },
                },
            }),
        ),
        spec(
            "debugger_wait_for_paused",
            "Block until the debugger pauses, or time out.",
            json!({
                "type": "object",
                "properties": { "timeoutMs": { "type": "integer", "default": 30000 } },
            }),
        ),
        spec("debugger_export_session", "Snapshot breakpoints and pause-on-exceptions state.", empty_schema()),
        spec(
            "debugger_import_session",
            "Clear existing breakpoints and reinstall from a snapshot.",
            json!({ "type": "object", "properties": { "snapshot": { "type": "object" } }, "required": ["snapshot"] }),
        ),
        spec(
            "debugger_save_session",
            "Persist the current session snapshot to a JSON file.",
            json!({ "type": "object", "properties": { "path": { "type": "string" } } }),
        ),
        spec(
            "debugger_load_session",
            "Load a session snapshot from a JSON file on disk.",
            json!({ "type": "object", "properties": { "path": { "type": "string" } }, "required": ["path"] }),
        ),
        spec("debugger_list_saved_sessions", "List saved session files, newest first.", empty_schema()),
        // --- breakpoint_* ---
        spec(
            "breakpoint_set",
            "Set a breakpoint by URL or scriptId at a given line/column.",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string" },
                    "scriptId": { "type": "string" },
                    "lineNumber": { "type": "integer" },
                    "columnNumber": { "type": "integer" },
                    "condition": { "type": "string" },
                },
                "required": ["lineNumber"],
            }),
        ),
        spec(
            "breakpoint_remove",
            "Remove a breakpoint by id.",
            json!({ "type": "object", "properties": { "breakpointId": { "type": "string" } }, "required": ["breakpointId"] }),
        ),
        spec("breakpoint_list", "List all registered breakpoints.", empty_schema()),
        spec("breakpoint_clear_all", "Remove every registered breakpoint.", empty_schema()),
        spec(
            "breakpoint_set_pause_on_exceptions",
            "Set the pause-on-exceptions mode.",
            json!({
                "type": "object",
                "properties": { "state": { "type": "string", "enum": ["none", "uncaught", "all"] } },
                "required": ["state"],
            }),
        ),
        spec("breakpoint_get_pause_on_exceptions", "Get the current pause-on-exceptions mode.", empty_schema()),
        // --- xhr_* ---
        spec(
            "xhr_set_breakpoint",
            "Break execution when an XHR/fetch URL matches a pattern.",
            json!({ "type": "object", "properties": { "urlPattern": { "type": "string" } }, "required": ["urlPattern"] }),
        ),
        spec(
            "xhr_remove_breakpoint",
            "Remove an XHR breakpoint by id.",
            json!({ "type": "object", "properties": { "id": { "type": "string" } }, "required": ["id"] }),
        ),
        spec("xhr_list_breakpoints", "List registered XHR breakpoints.", empty_schema()),
        // --- event_* ---
        spec(
            "event_set_breakpoint",
            "Break when a DOM event listener of this type fires.",
            json!({ "type": "object", "properties": { "eventName": { "type": "string" } }, "required": ["eventName"] }),
        ),
        spec(
            "event_remove_breakpoint",
            "Remove an event listener breakpoint.",
            json!({ "type": "object", "properties": { "eventName": { "type": "string" } }, "required": ["eventName"] }),
        ),
        spec(
            "event_set_bundle",
            "Set a predefined bundle of event breakpoints (mouse, keyboard, timer, websocket).",
            json!({
                "type": "object",
                "properties": { "bundle": { "type": "string", "enum": ["mouse", "keyboard", "timer", "websocket"] } },
                "required": ["bundle"],
            }),
        ),
        spec("event_list_breakpoints", "List active event listener breakpoints.", empty_schema()),
        // --- watch_* ---
        spec(
            "watch_add",
            "Add a named watch expression.",
            json!({
                "type": "object",
                "properties": { "name": { "type": "string" }, "expression": { "type": "string" } },
                "required": ["name", "expression"],
            }),
        ),
        spec(
            "watch_remove",
            "Remove a watch expression by name.",
            json!({ "type": "object", "properties": { "name": { "type": "string" } }, "required": ["name"] }),
        ),
        spec("watch_list", "List registered watch expressions.", empty_schema()),
        spec(
            "watch_evaluate_all",
            "Evaluate every watch expression against the current frame or global context.",
            json!({ "type": "object", "properties": { "callFrameId": { "type": "string" } } }),
        ),
        // --- blackbox_* ---
        spec(
            "blackbox_add",
            "Add a URL pattern to blackbox (step through without surfacing frames).",
            json!({ "type": "object", "properties": { "pattern": { "type": "string" } }, "required": ["pattern"] }),
        ),
        spec(
            "blackbox_remove",
            "Remove a blackbox pattern.",
            json!({ "type": "object", "properties": { "pattern": { "type": "string" } }, "required": ["pattern"] }),
        ),
        spec("blackbox_list", "List active blackbox patterns.", empty_schema()),
        spec(
            "blackbox_apply_common_library_bundle",
            "Blackbox the common third-party library bundle (jquery, react, lodash, ...).",
            empty_schema(),
        ),
        // --- network_* ---
        spec("network_enable", "Enable network capture, co-enabling the console monitor.", empty_schema()),
        spec("network_disable", "Disable network capture and clear recorded data.", empty_schema()),
        spec("network_get_requests", "List captured network requests.", empty_schema()),
        spec("network_get_responses", "List captured network responses.", empty_schema()),
        spec(
            "network_get_response_body",
            "Fetch the body of a completed response by requestId.",
            json!({ "type": "object", "properties": { "requestId": { "type": "string" } }, "required": ["requestId"] }),
        ),
        spec(
            "network_get_all_javascript_responses",
            "Fetch and decode every captured response that looks like JavaScript.",
            empty_schema(),
        ),
        // --- console_* ---
        spec(
            "console_execute",
            "Evaluate an expression against the page's global context.",
            json!({ "type": "object", "properties": { "expression": { "type": "string" } }, "required": ["expression"] }),
        ),
        spec(
            "console_get_messages",
            "List captured console messages, optionally filtered.",
            json!({
                "type": "object",
                "properties": {
                    "type": { "type": "string" },
                    "url": { "type": "string" },
                    "since": { "type": "string" },
                    "limit": { "type": "integer" },
                },
            }),
        ),
        spec(
            "console_get_exceptions",
            "List captured uncaught exceptions, optionally filtered.",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string" },
                    "since": { "type": "string" },
                    "limit": { "type": "integer" },
                },
            }),
        ),
        spec("console_enable_dynamic_script_monitoring", "Install the dynamic-script-creation monitor.", empty_schema()),
        spec("console_inject_xhr_interceptor", "Install the XHR interceptor.", empty_schema()),
        spec("console_inject_fetch_interceptor", "Install the fetch interceptor.", empty_schema()),
        spec(
            "console_inject_function_tracer",
            "Install a tracing Proxy around `window[name]`.",
            json!({ "type": "object", "properties": { "name": { "type": "string" } }, "required": ["name"] }),
        ),
        spec(
            "console_inject_property_watcher",
            "Install a getter/setter watcher on a dotted property path.",
            json!({
                "type": "object",
                "properties": { "path": { "type": "string" }, "name": { "type": "string" } },
                "required": ["path", "name"],
            }),
        ),
        // --- script_* ---
        spec(
            "script_get_source",
            "Resolve a script by id or URL glob, fetching and indexing its source.",
            json!({
                "type": "object",
                "properties": { "scriptId": { "type": "string" }, "urlGlob": { "type": "string" } },
            }),
        ),
        spec(
            "script_search_in_scripts",
            "Search indexed script source for a keyword or regex.",
            json!({
                "type": "object",
                "properties": {
                    "keyword": { "type": "string" },
                    "isRegex": { "type": "boolean", "default": false },
                    "caseSensitive": { "type": "boolean", "default": false },
                    "contextLines": { "type": "integer", "default": 3 },
                    "maxMatches": { "type": "integer", "default": 100 },
                },
                "required": ["keyword"],
            }),
        ),
        spec(
            "script_extract_function_tree",
            "Extract a function and its call graph up to maxDepth from a parsed script.",
            json!({
                "type": "object",
                "properties": {
                    "scriptId": { "type": "string" },
                    "functionName": { "type": "string" },
                    "maxDepth": { "type": "integer", "default": 3 },
                    "maxSize": { "type": "integer", "default": 262144 },
                    "includeComments": { "type": "boolean", "default": true },
                },
                "required": ["scriptId", "functionName"],
            }),
        ),
        spec(
            "collect_code",
            "Collect and disk-cache every parsed script whose URL contains a substring, keyed by that URL for later reuse.",
            json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string" },
                    "forceRefresh": { "type": "boolean", "default": false },
                    "smartMode": { "type": "string", "enum": ["full", "summary"] },
                    "returnSummaryOnly": { "type": "boolean", "default": false, "description": "Deprecated: use smartMode=\"summary\"." },
                },
                "required": ["url"],
            }),
        ),
        spec("script_list", "List every parsed script.", empty_schema()),
        spec("script_clear", "Wipe the script catalog's in-memory maps.", empty_schema()),
        spec("script_get_stats", "Report script/chunk/index counts.", empty_schema()),
        // --- ai_hook_* ---
        spec(
            "ai_hook_generate",
            "Generate an injectable JS hook (function/xhr/fetch/websocket/localstorage/cookie/eval/object-method).",
            json!({
                "type": "object",
                "properties": {
                    "target": { "type": "string" },
                    "type": {
                        "type": "string",
                        "enum": ["function", "xhr", "fetch", "websocket", "localstorage", "cookie", "eval", "object-method"],
                    },
                    "action": { "type": "string", "enum": ["log", "block", "modify"] },
                    "customCode": { "type": "string" },
                    "condition": {
                        "type": "object",
                        "properties": {
                            "maxCalls": { "type": "integer" },
                            "minIntervalMs": { "type": "integer" },
                        },
                    },
                    "performance": { "type": "boolean", "default": false },
                },
                "required": ["target", "type", "action"],
            }),
        ),
        spec("ai_hook_anti_debug_bypass", "Generate the fixed anti-debug-bypass script.", empty_schema()),
        spec(
            "ai_hook_get_records",
            "Fetch invocation records accumulated server-side for a hook id.",
            json!({ "type": "object", "properties": { "hookId": { "type": "string" } }, "required": ["hookId"] }),
        ),
        spec(
            "ai_hook_ingest_records",
            "Ingest invocation records pulled from the page's __aiHooks accumulator.",
            json!({
                "type": "object",
                "properties": { "hookId": { "type": "string" }, "records": { "type": "array" } },
                "required": ["hookId", "records"],
            }),
        ),
        spec(
            "ai_hook_clear_records",
            "Clear invocation records for a hook id.",
            json!({ "type": "object", "properties": { "hookId": { "type": "string" } }, "required": ["hookId"] }),
        ),
        spec("ai_hook_clear_all_records", "Clear every hook's invocation records.", empty_schema()),
        // --- budget / cache ---
        spec("get_budget_stats", "Report Token Budget usage and history.", empty_schema()),
        spec(
            "get_detailed_data",
            "Retrieve a full payload previously externalized behind a detailId.",
            json!({
                "type": "object",
                "properties": { "detailId": { "type": "string" }, "path": { "type": "string" } },
                "required": ["detailId"],
            }),
        ),
        spec("get_cache_stats", "Report aggregate stats across every registered cache.", empty_schema()),
        spec("clear_detail_store", "Clear every externalized detail-id entry.", empty_schema()),
        spec(
            "manual_cleanup",
            "Run a smart cleanup pass across every registered cache.",
            json!({ "type": "object", "properties": { "targetBytes": { "type": "integer" } } }),
        ),
        spec("reset_token_budget", "Reset the Token Budget counter independently of cache state.", empty_schema()),
        // --- external AI-analysis facades ---
        spec(
            "analysis_deobfuscate",
            "Use the configured LLM to deobfuscate a code snippet.",
            json!({
                "type": "object",
                "properties": { "code": { "type": "string" }, "aggressive": { "type": "boolean", "default": false } },
                "required": ["code"],
            }),
        ),
        spec(
            "analysis_detect_obfuscation",
            "Classify the obfuscation techniques present in a code snippet.",
            json!({ "type": "object", "properties": { "code": { "type": "string" } }, "required": ["code"] }),
        ),
        spec(
            "analysis_detect_crypto",
            "Identify cryptographic algorithms/libraries in use and flag weak configurations.",
            json!({ "type": "object", "properties": { "code": { "type": "string" } }, "required": ["code"] }),
        ),
        spec(
            "analysis_understand_code",
            "Summarize a code snippet's structure, call graph, and data flow.",
            json!({
                "type": "object",
                "properties": { "code": { "type": "string" }, "focus": { "type": "string" } },
                "required": ["code"],
            }),
        ),
        spec(
            "analysis_environment_emulator",
            "Generate environment-patching code to emulate a browser runtime outside the browser.",
            json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "runtime": { "type": "string", "enum": ["node", "python"] },
                    "browserType": { "type": "string" },
                },
                "required": ["code", "runtime"],
            }),
        ),
        // --- server info ---
        spec(
            "get_server_info",
            "Report server name, version, and browser/session status.",
            empty_schema(),
        ),
    ]
}
