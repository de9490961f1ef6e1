//! 后端提供方：封闭集合，配置中的字符串在此解析一次

use std::fmt;
use std::str::FromStr;

use crate::core::GatewayError;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEEPSEEK_CHAT_URL: &str = "https://api.deepseek.com/chat/completions";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Anthropic,
    OpenAi,
    DeepSeek,
    Custom,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.0-flash",
            Provider::Anthropic => "claude-3-5-sonnet-20240620",
            Provider::OpenAi => "gpt-4o",
            Provider::DeepSeek => "deepseek-chat",
            Provider::Custom => "gpt-3.5-turbo",
        }
    }

    /// Custom 端点可不带 Key（本地模型等）
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Provider::Custom)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Gemini => "Gemini",
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
            Provider::DeepSeek => "DeepSeek",
            Provider::Custom => "Custom",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "deepseek" => Ok(Provider::DeepSeek),
            "custom" => Ok(Provider::Custom),
            other => Err(GatewayError::Config(format!(
                "Provider {} not implemented",
                other
            ))),
        }
    }
}

/// Custom 端点：已含 /chat/completions 则原样使用，否则补全
pub fn normalize_chat_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("/chat/completions") {
        url.to_string()
    } else {
        format!("{}/chat/completions", url.trim_end_matches('/'))
    }
}
