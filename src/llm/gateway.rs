//! 模型网关：把三种线协议归一为一次 infer 调用
//!
//! 每次 infer：重新读取配置 -> 选出 Backend 变体 -> 拼装 system prompt（回复格式 + 工具清单 + 语言 + 附加指令）
//! -> 发送请求 -> 三级回退解析为 Decision。Backend 无状态，每次调用重新构造。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ConfigSource, LlmSettings};
use crate::core::GatewayError;
use crate::llm::anthropic::AnthropicBackend;
use crate::llm::gemini::GeminiBackend;
use crate::llm::openai::ChatCompletionsBackend;
use crate::llm::provider::{
    normalize_chat_url, Provider, ANTHROPIC_BASE_URL, DEEPSEEK_CHAT_URL, GEMINI_BASE_URL,
    OPENAI_CHAT_URL,
};
use crate::llm::traits::{to_wire_messages, WireMessage};
use crate::llm::{decision_schema_json, parse_decision, Decision, LlmClient, ToolSpec};
use crate::memory::Message;

/// 封闭的方言集合，每种方言一个构造
#[derive(Clone, Debug, PartialEq)]
pub enum Backend {
    /// 单次 generateContent（parts 数组）
    Generate(GeminiBackend),
    /// 独立 system 字段的 messages 接口
    Messages(AnthropicBackend),
    /// 通用 chat-completions
    ChatCompletions(ChatCompletionsBackend),
}

impl Backend {
    /// 按配置选择方言；缺 Key / 缺端点 / 未知 provider 都是配置错误
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, GatewayError> {
        let provider: Provider = settings.provider.parse()?;
        let api_key = settings.api_key.trim().to_string();
        if provider.requires_api_key() && api_key.is_empty() {
            return Err(GatewayError::Config(format!(
                "API key for {} not configured",
                provider
            )));
        }

        let model = match settings.model.trim() {
            "" => provider.default_model().to_string(),
            m => m.to_string(),
        };
        let custom_url = settings.custom_url.trim();
        let base_or = |default: &str| {
            if custom_url.is_empty() {
                default.to_string()
            } else {
                custom_url.to_string()
            }
        };

        let backend = match provider {
            Provider::Gemini => Backend::Generate(GeminiBackend {
                base_url: base_or(GEMINI_BASE_URL),
                api_key,
                model,
            }),
            Provider::Anthropic => Backend::Messages(AnthropicBackend {
                base_url: base_or(ANTHROPIC_BASE_URL),
                api_key,
                model,
                max_tokens: settings.max_tokens,
            }),
            Provider::OpenAi | Provider::DeepSeek | Provider::Custom => {
                let url = match (provider, custom_url) {
                    (_, u) if !u.is_empty() => normalize_chat_url(u),
                    (Provider::OpenAi, _) => OPENAI_CHAT_URL.to_string(),
                    (Provider::DeepSeek, _) => DEEPSEEK_CHAT_URL.to_string(),
                    _ => {
                        return Err(GatewayError::Config(
                            "Custom endpoint URL not configured".to_string(),
                        ))
                    }
                };
                Backend::ChatCompletions(ChatCompletionsBackend {
                    provider: provider.to_string(),
                    url,
                    api_key,
                    model,
                })
            }
        };
        Ok(backend)
    }

    pub fn provider_name(&self) -> &str {
        match self {
            Backend::Generate(_) => "Gemini",
            Backend::Messages(_) => "Anthropic",
            Backend::ChatCompletions(b) => &b.provider,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Backend::Generate(b) => &b.model,
            Backend::Messages(b) => &b.model,
            Backend::ChatCompletions(b) => &b.model,
        }
    }

    /// 发送请求，返回助手原始文本
    pub async fn complete(
        &self,
        http: &reqwest::Client,
        system_prompt: &str,
        messages: &[WireMessage],
    ) -> Result<String, GatewayError> {
        match self {
            Backend::Generate(b) => b.complete(http, system_prompt, messages).await,
            Backend::Messages(b) => b.complete(http, system_prompt, messages).await,
            Backend::ChatCompletions(b) => b.complete(http, system_prompt, messages).await,
        }
    }
}

/// 最终发给后端的 system prompt
pub fn compose_system_prompt(base: &str, tools: &[ToolSpec], settings: &LlmSettings) -> String {
    let manifest = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    let mut prompt = format!(
        "{}\n\n## Response format\nReply with a single JSON object matching this schema:\n{}\n\n## Available tools\n{}\n",
        base.trim_end(),
        decision_schema_json(),
        manifest
    );
    if !settings.language.trim().is_empty() {
        prompt.push_str(&format!(
            "\nRespond to the user in {}.\n",
            settings.language.trim()
        ));
    }
    if !settings.custom_instructions.trim().is_empty() {
        prompt.push_str(&format!(
            "\n## Additional instructions\n{}\n",
            settings.custom_instructions.trim()
        ));
    }
    prompt
}

/// 真实网关：持有配置来源与复用的 HTTP 连接池
pub struct ModelGateway {
    config: Arc<dyn ConfigSource>,
    http: reqwest::Client,
}

impl ModelGateway {
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for ModelGateway {
    async fn infer(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Decision, GatewayError> {
        let settings = self.config.llm_settings()?;
        let backend = Backend::from_settings(&settings)?;
        let system = compose_system_prompt(system_prompt, tools, &settings);
        let wire = to_wire_messages(messages);

        tracing::info!(
            provider = backend.provider_name(),
            model = backend.model(),
            messages = wire.len(),
            "inference request"
        );

        let secs = settings.request_timeout_secs;
        let text = tokio::time::timeout(
            Duration::from_secs(secs),
            backend.complete(&self.http, &system, &wire),
        )
        .await
        .map_err(|_| GatewayError::Transport {
            provider: backend.provider_name().to_string(),
            message: format!("timed out after {}s", secs),
        })??;

        Ok(parse_decision(&text))
    }
}
