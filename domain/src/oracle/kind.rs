//! Supported oracle providers.

use crate::core::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Provider an oracle is served by (Value Object).
///
/// This is a closed set: every place that needs provider-specific behavior
/// matches on it exhaustively, so adding a provider is a compile error until
/// every adapter table handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleKind {
    OpenAi,
    Anthropic,
    Gemini,
    DeepSeek,
    Qwen,
    StepFun,
    Zhipu,
    MiniMax,
    Grok,
    OpenRouter,
}

/// HTTP request/response shape spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireDialect {
    /// `POST /chat/completions` with `choices[].message.content`
    OpenAiChat,
    /// `POST /v1/messages` with `content[].text`
    AnthropicMessages,
    /// `POST /models/{model}:generateContent` with `candidates[].content.parts[].text`
    GeminiGenerate,
}

impl OracleKind {
    pub const ALL: [OracleKind; 10] = [
        OracleKind::OpenAi,
        OracleKind::Anthropic,
        OracleKind::Gemini,
        OracleKind::DeepSeek,
        OracleKind::Qwen,
        OracleKind::StepFun,
        OracleKind::Zhipu,
        OracleKind::MiniMax,
        OracleKind::Grok,
        OracleKind::OpenRouter,
    ];

    /// Position of this provider in [`OracleKind::ALL`], for per-provider
    /// tables.
    pub const fn index(self) -> usize {
        match self {
            OracleKind::OpenAi => 0,
            OracleKind::Anthropic => 1,
            OracleKind::Gemini => 2,
            OracleKind::DeepSeek => 3,
            OracleKind::Qwen => 4,
            OracleKind::StepFun => 5,
            OracleKind::Zhipu => 6,
            OracleKind::MiniMax => 7,
            OracleKind::Grok => 8,
            OracleKind::OpenRouter => 9,
        }
    }

    /// Provider identifier as used in configuration and cache fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleKind::OpenAi => "openai",
            OracleKind::Anthropic => "anthropic",
            OracleKind::Gemini => "gemini",
            OracleKind::DeepSeek => "deepseek",
            OracleKind::Qwen => "qwen",
            OracleKind::StepFun => "stepfun",
            OracleKind::Zhipu => "zhipu",
            OracleKind::MiniMax => "minimax",
            OracleKind::Grok => "grok",
            OracleKind::OpenRouter => "openrouter",
        }
    }

    /// Model used when a configured oracle names only its provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            OracleKind::OpenAi => "gpt-4.1",
            OracleKind::Anthropic => "claude-3-7-sonnet-20250219",
            OracleKind::Gemini => "gemini-2.5-pro-preview-03-25",
            OracleKind::DeepSeek => "deepseek-chat",
            OracleKind::Qwen => "qwen-max-2025-01-25",
            OracleKind::StepFun => "step-2-16k",
            OracleKind::Zhipu => "glm-4",
            OracleKind::MiniMax => "MiniMax-Text-01",
            OracleKind::Grok => "grok-3-beta",
            OracleKind::OpenRouter => "openai/gpt-4.1",
        }
    }

    /// Conventional environment variable holding the provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            OracleKind::OpenAi => "OPENAI_API_KEY",
            OracleKind::Anthropic => "ANTHROPIC_API_KEY",
            OracleKind::Gemini => "GEMINI_API_KEY",
            OracleKind::DeepSeek => "DEEPSEEK_API_KEY",
            OracleKind::Qwen => "QWEN_API_KEY",
            OracleKind::StepFun => "STEPFUN_API_KEY",
            OracleKind::Zhipu => "ZHIPU_API_KEY",
            OracleKind::MiniMax => "MINIMAX_API_KEY",
            OracleKind::Grok => "GROK_API_KEY",
            OracleKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn dialect(&self) -> WireDialect {
        match self {
            OracleKind::Anthropic => WireDialect::AnthropicMessages,
            OracleKind::Gemini => WireDialect::GeminiGenerate,
            OracleKind::OpenAi
            | OracleKind::DeepSeek
            | OracleKind::Qwen
            | OracleKind::StepFun
            | OracleKind::Zhipu
            | OracleKind::MiniMax
            | OracleKind::Grok
            | OracleKind::OpenRouter => WireDialect::OpenAiChat,
        }
    }

    /// Default API endpoint (without model-specific path for Gemini).
    pub fn default_base_url(&self) -> &'static str {
        match self {
            OracleKind::OpenAi => "https://api.openai.com/v1",
            OracleKind::Anthropic => "https://api.anthropic.com/v1",
            OracleKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            OracleKind::DeepSeek => "https://api.deepseek.com/v1",
            OracleKind::Qwen => "https://dashscope-intl.aliyuncs.com/compatible-mode/v1",
            OracleKind::StepFun => "https://api.stepfun.com/v1",
            OracleKind::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
            OracleKind::MiniMax => "https://api.minimax.chat/v1",
            OracleKind::Grok => "https://api.x.ai/v1",
            OracleKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Guess the provider from a bare model id (e.g. `"claude-3-opus"`).
    pub fn infer_from_model(model: &str) -> Option<OracleKind> {
        let model = model.to_lowercase();
        if model.contains('/') {
            return Some(OracleKind::OpenRouter);
        }
        let kind = if model.starts_with("gpt") || model.starts_with("o1") || model.starts_with("o3") {
            OracleKind::OpenAi
        } else if model.starts_with("claude") {
            OracleKind::Anthropic
        } else if model.starts_with("gemini") {
            OracleKind::Gemini
        } else if model.starts_with("deepseek") {
            OracleKind::DeepSeek
        } else if model.starts_with("qwen") {
            OracleKind::Qwen
        } else if model.starts_with("step") {
            OracleKind::StepFun
        } else if model.starts_with("glm") {
            OracleKind::Zhipu
        } else if model.starts_with("minimax") {
            OracleKind::MiniMax
        } else if model.starts_with("grok") {
            OracleKind::Grok
        } else {
            return None;
        };
        Some(kind)
    }
}

impl std::fmt::Display for OracleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OracleKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        OracleKind::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| ConfigError::UnknownProvider(s.to_string()))
    }
}

impl Serialize for OracleKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OracleKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
