//! Wire formats for the three provider dialects.
//!
//! Each dialect decodes into its own response record; only the extracted
//! text leaves this module.

use celltype_application::OracleError;
use celltype_domain::WireDialect;
use serde::Deserialize;
use serde_json::{Value, json};

const ANTHROPIC_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<MessagesContentBlock>,
}

#[derive(Debug, Deserialize)]
struct MessagesContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<GenerateCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GenerateCandidate {
    #[serde(default)]
    content: Option<GenerateContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateContent {
    #[serde(default)]
    parts: Option<Vec<GeneratePart>>,
}

#[derive(Debug, Deserialize)]
struct GeneratePart {
    #[serde(default)]
    text: Option<String>,
}

/// Request path relative to the provider's base URL.
pub fn endpoint_path(dialect: WireDialect, model: &str) -> String {
    match dialect {
        WireDialect::OpenAiChat => "/chat/completions".to_string(),
        WireDialect::AnthropicMessages => "/messages".to_string(),
        WireDialect::GeminiGenerate => format!("/models/{}:generateContent", model),
    }
}

/// JSON request body for a single user prompt.
pub fn request_body(dialect: WireDialect, model: &str, prompt: &str) -> Value {
    match dialect {
        WireDialect::OpenAiChat => json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
        }),
        WireDialect::AnthropicMessages => json!({
            "model": model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        }),
        WireDialect::GeminiGenerate => json!({
            "contents": [{"parts": [{"text": prompt}]}],
        }),
    }
}

/// Pull the response text out of a successful body.
pub fn extract_text(dialect: WireDialect, body: &str) -> Result<String, OracleError> {
    let decode_error =
        |e: serde_json::Error| OracleError::MalformedResponse(format!("undecodable body: {}", e));

    let text = match dialect {
        WireDialect::OpenAiChat => {
            let parsed: ChatCompletionsResponse =
                serde_json::from_str(body).map_err(decode_error)?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default()
        }
        WireDialect::AnthropicMessages => {
            let parsed: MessagesResponse = serde_json::from_str(body).map_err(decode_error)?;
            parsed
                .content
                .into_iter()
                .filter(|block| block.kind == "text")
                .filter_map(|block| block.text)
                .collect::<Vec<_>>()
                .join("\n")
        }
        WireDialect::GeminiGenerate => {
            let parsed: GenerateContentResponse =
                serde_json::from_str(body).map_err(decode_error)?;
            parsed
                .candidates
                .unwrap_or_default()
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|c| c.parts)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        }
    };

    if text.trim().is_empty() {
        return Err(OracleError::MalformedResponse(
            "response contained no text".to_string(),
        ));
    }
    Ok(text)
}

/// Split response text into lines, dropping trailing commas.
pub fn split_lines(text: &str) -> Vec<String> {
    text.trim()
        .lines()
        .map(|line| line.trim_end().trim_end_matches(',').to_string())
        .collect()
}

/// Best-effort human message from an error body.
pub fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message").or(Some(e)))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    from_json.unwrap_or_else(|| celltype_domain::core::string::one_line_preview(body, 300))
}
