//! Messages 方言（Anthropic）
//!
//! system 单独字段；消息必须 user / assistant 交替，相邻同角色合并；回复文本在 content[0].text。

use serde::Serialize;
use serde_json::Value;

use crate::core::GatewayError;
use crate::llm::http::{post_json, reply_text};
use crate::llm::traits::{WireMessage, WireRole};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: &'static str,
    content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnthropicBackend {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

/// 相邻同角色消息以空行拼接
fn merge_adjacent(messages: &[WireMessage]) -> Vec<MessageParam> {
    let mut merged: Vec<(WireRole, String)> = Vec::new();
    for m in messages {
        match merged.last_mut() {
            Some((role, content)) if *role == m.role => {
                content.push_str("\n\n");
                content.push_str(&m.content);
            }
            _ => merged.push((m.role, m.content.clone())),
        }
    }
    merged
        .into_iter()
        .map(|(role, content)| MessageParam {
            role: role.as_str(),
            content,
        })
        .collect()
}

impl AnthropicBackend {
    pub fn url(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    pub fn build_body(&self, system_prompt: &str, messages: &[WireMessage]) -> Value {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: merge_adjacent(messages),
        };
        serde_json::to_value(request).unwrap_or(Value::Null)
    }

    pub async fn complete(
        &self,
        http: &reqwest::Client,
        system_prompt: &str,
        messages: &[WireMessage],
    ) -> Result<String, GatewayError> {
        let request = http
            .post(self.url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_body(system_prompt, messages));
        let data = post_json("Anthropic", request).await?;
        Ok(reply_text(&data, "/content/0/text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(role: WireRole, content: &str) -> WireMessage {
        WireMessage {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_body_has_separate_system_and_merged_roles() {
        let backend = AnthropicBackend {
            base_url: "https://api.anthropic.com/v1/".into(),
            api_key: "k".into(),
            model: "claude-3-5-sonnet-20240620".into(),
            max_tokens: 4096,
        };
        let body = backend.build_body(
            "SYS",
            &[
                wire(WireRole::User, "list files"),
                wire(WireRole::Assistant, "I will use tool: list_dir({})"),
                wire(WireRole::User, "Tool Result: a"),
                wire(WireRole::User, "Tool Result: b"),
            ],
        );
        assert_eq!(backend.url(), "https://api.anthropic.com/v1/messages");
        assert_eq!(body["system"], "SYS");
        assert_eq!(body["max_tokens"], 4096);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"], "Tool Result: a\n\nTool Result: b");
    }
}
