//! External AI-analysis facades (spec §4.L, interface only). Every facade
//! is a thin prompt-construction + response-parsing wrapper around an
//! `LLMProvider`; the heavy lifting lives in the remote model, not here.

mod providers;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ServerError};

pub use providers::{AnthropicProvider, FakeLlmProvider, NullLlmProvider, OpenAiProvider};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatCompletion>;
}

fn user_message(content: String) -> Vec<ChatMessage> {
    vec![ChatMessage {
        role: "user".to_string(),
        content,
    }]
}

async fn ask_json(llm: &dyn LLMProvider, prompt: String) -> Result<Value> {
    let completion = llm
        .chat(
            &user_message(prompt),
            &ChatOptions {
                temperature: Some(0.0),
                max_tokens: Some(2048),
            },
        )
        .await?;
    parse_json_response(&completion.content)
}

/// LLM responses are often fenced in ```json blocks; strip that before
/// parsing rather than demanding the provider emit bare JSON.
fn parse_json_response(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    let candidate = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(candidate)
        .map_err(|e| ServerError::Internal(format!("LLM response was not valid JSON: {e}")))
}

#[derive(Debug, Clone, Serialize)]
pub struct DeobfuscateResult {
    pub code: String,
    pub readability_score: f64,
    pub confidence: f64,
    pub obfuscation_type: Vec<String>,
    pub transformations: Vec<String>,
    pub analysis: String,
}

pub async fn deobfuscate(
    llm: &dyn LLMProvider,
    code: &str,
    aggressive: bool,
) -> Result<DeobfuscateResult> {
    let prompt = format!(
        "Deobfuscate the following JavaScript{agg}. Respond with JSON only, matching this \
         schema: {{\"code\": string, \"readabilityScore\": number 0-1, \"confidence\": number \
         0-1, \"obfuscationType\": string[], \"transformations\": string[], \"analysis\": \
         string}}.\n\n```javascript\n{code}\n```",
        agg = if aggressive {
            ", applying aggressive renaming and control-flow simplification"
        } else {
            ", preserving original identifiers where recoverable"
        },
    );
    let value = ask_json(llm, prompt).await?;
    Ok(DeobfuscateResult {
        code: field_str(&value, "code")?,
        readability_score: field_f64(&value, "readabilityScore").unwrap_or(0.0),
        confidence: field_f64(&value, "confidence").unwrap_or(0.0),
        obfuscation_type: field_str_vec(&value, "obfuscationType"),
        transformations: field_str_vec(&value, "transformations"),
        analysis: value
            .get("analysis")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Closed vocabulary of obfuscation tags, matched heuristically before the
/// LLM is consulted so a cheap, deterministic pre-pass narrows what the
/// model is asked to confirm.
const OBFUSCATION_TAGS: &[(&str, &str)] = &[
    ("javascript-obfuscator", r"_0x[0-9a-f]{4,}"),
    ("vm-protection", r"\bwasm\b|WebAssembly\.instantiate"),
    ("invisible-unicode", "[\u{200b}\u{200c}\u{200d}\u{feff}]"),
    ("control-flow-flattening", r"while\s*\(\s*true\s*\)\s*\{\s*switch"),
    ("jsfuck", r"^\s*[\[\]()!+]+\s*$"),
    ("aaencode", r"ﾟωﾟﾉ|ﾟДﾟ"),
    ("jjencode", r"\$\s*=\s*~\s*\[\s*\]"),
    ("packer", r"eval\(function\(p,a,c,k,e,"),
];

pub async fn detect_obfuscation(llm: &dyn LLMProvider, code: &str) -> Result<Vec<String>> {
    let mut tags: Vec<String> = OBFUSCATION_TAGS
        .iter()
        .filter(|(_, pattern)| Regex::new(pattern).map(|r| r.is_match(code)).unwrap_or(false))
        .map(|(tag, _)| tag.to_string())
        .collect();

    let prompt = format!(
        "Classify the obfuscation techniques present in this JavaScript. Choose only from \
         this vocabulary: javascript-obfuscator, vm-protection, invisible-unicode, \
         control-flow-flattening, jsfuck, aaencode, jjencode, packer. Respond with JSON only: \
         {{\"tags\": string[]}}.\n\n```javascript\n{code}\n```"
    );
    if let Ok(value) = ask_json(llm, prompt).await {
        for tag in field_str_vec(&value, "tags") {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    Ok(tags)
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityIssue {
    pub issue: String,
    pub severity: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CryptoDetection {
    pub algorithms: Vec<String>,
    pub libraries: Vec<String>,
    pub confidence: f64,
    pub security_issues: Vec<SecurityIssue>,
    pub strength: String,
}

const WEAK_ALGORITHM_RULES: &[(&str, &str, &str)] = &[
    ("MD5", "high", "MD5 is broken for collision resistance; do not use for integrity or passwords."),
    ("SHA-1", "medium", "SHA-1 is deprecated for collision resistance."),
    ("DES", "high", "DES's 56-bit key is brute-forceable; use AES instead."),
    ("RC4", "high", "RC4 has known keystream biases; avoid entirely."),
];

pub async fn detect_crypto(llm: &dyn LLMProvider, code: &str) -> Result<CryptoDetection> {
    let prompt = format!(
        "Identify cryptographic algorithms and libraries used in this JavaScript. Respond with \
         JSON only: {{\"algorithms\": string[], \"libraries\": string[], \"confidence\": number \
         0-1, \"ecbMode\": boolean, \"shortKey\": boolean, \"missingPadding\": boolean}}.\n\n\
         ```javascript\n{code}\n```"
    );
    let value = ask_json(llm, prompt).await?;
    let algorithms = field_str_vec(&value, "algorithms");
    let libraries = field_str_vec(&value, "libraries");

    let mut security_issues: Vec<SecurityIssue> = WEAK_ALGORITHM_RULES
        .iter()
        .filter(|(name, ..)| algorithms.iter().any(|a| a.eq_ignore_ascii_case(name)))
        .map(|(name, severity, detail)| SecurityIssue {
            issue: format!("{name}: {detail}"),
            severity: severity.to_string(),
        })
        .collect();
    if value.get("ecbMode").and_then(Value::as_bool).unwrap_or(false) {
        security_issues.push(SecurityIssue {
            issue: "ECB mode leaks block-level plaintext patterns.".to_string(),
            severity: "high".to_string(),
        });
    }
    if value.get("shortKey").and_then(Value::as_bool).unwrap_or(false) {
        security_issues.push(SecurityIssue {
            issue: "Key length is shorter than the algorithm's recommended minimum.".to_string(),
            severity: "medium".to_string(),
        });
    }
    if value.get("missingPadding").and_then(Value::as_bool).unwrap_or(false) {
        security_issues.push(SecurityIssue {
            issue: "Block cipher used without an authenticated padding scheme.".to_string(),
            severity: "medium".to_string(),
        });
    }

    let strength = if security_issues.iter().any(|i| i.severity == "high") {
        "weak"
    } else if security_issues.iter().any(|i| i.severity == "medium") {
        "moderate"
    } else if algorithms.is_empty() {
        "none-detected"
    } else {
        "strong"
    }
    .to_string();

    Ok(CryptoDetection {
        algorithms,
        libraries,
        confidence: field_f64(&value, "confidence").unwrap_or(0.0),
        security_issues,
        strength,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeUnderstanding {
    pub functions: Vec<String>,
    pub call_graph: Value,
    pub tech_stack: Vec<String>,
    pub data_flow_taint_paths: Vec<String>,
    pub security_risks: Vec<String>,
    pub complexity_metrics: Value,
}

pub async fn understand_code(
    llm: &dyn LLMProvider,
    code: &str,
    focus: Option<&str>,
) -> Result<CodeUnderstanding> {
    let prompt = format!(
        "Produce a structural summary of this JavaScript{focus_clause}. Respond with JSON \
         only: {{\"functions\": string[], \"callGraph\": object, \"techStack\": string[], \
         \"dataFlowTaintPaths\": string[], \"securityRisks\": string[], \"complexityMetrics\": \
         object}}.\n\n```javascript\n{code}\n```",
        focus_clause = focus
            .map(|f| format!(", focusing on {f}"))
            .unwrap_or_default(),
    );
    let value = ask_json(llm, prompt).await?;
    Ok(CodeUnderstanding {
        functions: field_str_vec(&value, "functions"),
        call_graph: value.get("callGraph").cloned().unwrap_or(Value::Null),
        tech_stack: field_str_vec(&value, "techStack"),
        data_flow_taint_paths: field_str_vec(&value, "dataFlowTaintPaths"),
        security_risks: field_str_vec(&value, "securityRisks"),
        complexity_metrics: value.get("complexityMetrics").cloned().unwrap_or(Value::Null),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentEmulation {
    pub detected_globals: Vec<String>,
    pub recommended_values: Value,
    pub patch_code: String,
}

pub async fn environment_emulator(
    llm: &dyn LLMProvider,
    code: &str,
    runtime: &str,
    browser_type: Option<&str>,
) -> Result<EnvironmentEmulation> {
    let prompt = format!(
        "This JavaScript expects a browser global environment and must run under {runtime}{bt}. \
         Identify which browser globals it touches and generate patch code for that runtime that \
         emulates them. Respond with JSON only: {{\"detectedGlobals\": string[], \
         \"recommendedValues\": object, \"patchCode\": string}}.\n\n```javascript\n{code}\n```",
        bt = browser_type
            .map(|b| format!(" emulating {b}"))
            .unwrap_or_default(),
    );
    let value = ask_json(llm, prompt).await?;
    Ok(EnvironmentEmulation {
        detected_globals: field_str_vec(&value, "detectedGlobals"),
        recommended_values: value.get("recommendedValues").cloned().unwrap_or(Value::Null),
        patch_code: value
            .get("patchCode")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn field_str(value: &Value, key: &str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ServerError::Internal(format!("LLM response missing `{key}`")))
}

fn field_f64(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn field_str_vec(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_response_strips_markdown_fence() {
        let raw = "```json\n{\"a\":1}\n```";
        let value = parse_json_response(raw).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[tokio::test]
    async fn detect_obfuscation_flags_packer_heuristically_even_if_llm_fails() {
        let llm = NullLlmProvider::new();
        let code = "eval(function(p,a,c,k,e,d){return p}('a',1,1,'a'.split('|'),0,{}))";
        let tags = detect_obfuscation(&llm, code).await.unwrap();
        assert!(tags.contains(&"packer".to_string()));
    }
}
