//! generateContent 方言（Gemini）
//!
//! 单次请求的 parts 数组：首条 user 携带 "SYSTEM INSTRUCTIONS"，assistant 映射为 model；
//! generationConfig 提示返回 application/json；回复文本在 candidates[0].content.parts[0].text。

use serde::Serialize;
use serde_json::Value;

use crate::core::GatewayError;
use crate::llm::http::{post_json, reply_text};
use crate::llm::traits::{WireMessage, WireRole};

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeminiBackend {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeminiBackend {
    pub fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    pub fn build_body(&self, system_prompt: &str, messages: &[WireMessage]) -> Value {
        let system = format!("SYSTEM INSTRUCTIONS:\n{}", system_prompt);
        let mut contents = vec![Content {
            role: "user",
            parts: vec![Part { text: &system }],
        }];
        contents.extend(messages.iter().map(|m| Content {
            role: match m.role {
                WireRole::Assistant => "model",
                WireRole::User => "user",
            },
            parts: vec![Part { text: &m.content }],
        }));
        let request = GenerateRequest {
            contents,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
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
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_body(system_prompt, messages));
        let data = post_json("Gemini", request).await?;
        Ok(reply_text(&data, "/candidates/0/content/parts/0/text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_body() {
        let backend = GeminiBackend {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: "k".into(),
            model: "gemini-2.0-flash".into(),
        };
        let body = backend.build_body(
            "SYS",
            &[
                WireMessage {
                    role: WireRole::User,
                    content: "hi".into(),
                },
                WireMessage {
                    role: WireRole::Assistant,
                    content: "hello".into(),
                },
            ],
        );
        assert_eq!(
            backend.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(body["contents"][0]["parts"][0]["text"], "SYSTEM INSTRUCTIONS:\nSYS");
        assert_eq!(body["contents"][1]["role"], "user");
        assert_eq!(body["contents"][2]["role"], "model");
        assert_eq!(body["generationConfig"]["response_mime_type"], "application/json");
    }
}
