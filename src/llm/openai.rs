//! Chat Completions 方言（OpenAI / DeepSeek / Custom 兼容端点）
//!
//! system 作为消息数组的第一条注入；response_format 要求 JSON 对象；回复文本在 choices[0].message.content。

use serde::Serialize;
use serde_json::Value;

use crate::core::GatewayError;
use crate::llm::http::{post_json, reply_text};
use crate::llm::traits::WireMessage;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

/// Chat Completions 适配器；每次调用按当前配置重新构造
#[derive(Clone, Debug, PartialEq)]
pub struct ChatCompletionsBackend {
    pub provider: String,
    pub url: String,
    pub api_key: String,
    pub model: String,
}

impl ChatCompletionsBackend {
    pub fn build_body(&self, system_prompt: &str, messages: &[WireMessage]) -> Value {
        let mut chat = Vec::with_capacity(messages.len() + 1);
        chat.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
        chat.extend(messages.iter().map(|m| ChatMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));
        let request = ChatCompletionRequest {
            model: &self.model,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: chat,
        };
        serde_json::to_value(request).unwrap_or(Value::Null)
    }

    pub async fn complete(
        &self,
        http: &reqwest::Client,
        system_prompt: &str,
        messages: &[WireMessage],
    ) -> Result<String, GatewayError> {
        let body = self.build_body(system_prompt, messages);
        let mut request = http.post(&self.url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let data = post_json(&self.provider, request).await?;
        Ok(reply_text(&data, "/choices/0/message/content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::traits::WireRole;

    #[test]
    fn test_system_injected_first_with_json_mode() {
        let backend = ChatCompletionsBackend {
            provider: "DeepSeek".into(),
            url: "https://api.deepseek.com/chat/completions".into(),
            api_key: "k".into(),
            model: "deepseek-chat".into(),
        };
        let body = backend.build_body(
            "SYS",
            &[WireMessage {
                role: WireRole::User,
                content: "hi".into(),
            }],
        );
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0], serde_json::json!({"role": "system", "content": "SYS"}));
        assert_eq!(body["messages"][1], serde_json::json!({"role": "user", "content": "hi"}));
    }
}
