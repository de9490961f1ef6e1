//! LLM 客户端抽象
//!
//! Orchestrator 只依赖 LlmClient：给定 system prompt、消息日志与工具清单，返回一个 Decision。
//! 真实实现为 ModelGateway（三种线协议），测试与离线运行用 MockLlmClient。

use async_trait::async_trait;
use serde::Serialize;

use crate::core::GatewayError;
use crate::llm::Decision;
use crate::memory::{Message, Role};

/// 交给后端的工具描述：只含名称、描述与参数 schema，不含执行器
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn infer(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Decision, GatewayError>;
}

/// 线上角色：三种方言都只区分 user / assistant（system 单独传）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireRole {
    User,
    Assistant,
}

impl WireRole {
    pub fn as_str(self) -> &'static str {
        match self {
            WireRole::User => "user",
            WireRole::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

/// 会话日志 -> 线上消息：thought 作为 assistant 的 "[Thought] ..."，工具结果作为 user 的 "Tool Result: ..."；
/// 审批提示只给界面看，不发给后端
pub fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .filter(|m| !m.requires_approval)
        .map(|m| match m.role {
            Role::User => WireMessage {
                role: WireRole::User,
                content: m.content.clone(),
            },
            Role::Assistant => WireMessage {
                role: WireRole::Assistant,
                content: m.content.clone(),
            },
            Role::Thought => WireMessage {
                role: WireRole::Assistant,
                content: format!("[Thought] {}", m.content),
            },
            Role::Tool => WireMessage {
                role: WireRole::User,
                content: format!("Tool Result: {}", m.content),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ToolCall;

    #[test]
    fn test_wire_rendering() {
        let call = ToolCall {
            name: "run_command".into(),
            args: serde_json::json!({"command": "ls"}),
            call_id: "c1".into(),
        };
        let log = vec![
            Message::user("list files"),
            Message::thought("need a listing"),
            Message::approval_request(call.clone()),
            Message::tool_intent(call),
            Message::tool_result("c1", "a.rs"),
        ];
        let wire = to_wire_messages(&log);
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[1].content, "[Thought] need a listing");
        assert_eq!(wire[1].role, WireRole::Assistant);
        assert!(wire[2].content.starts_with("I will use tool: run_command("));
        assert_eq!(wire[3].role, WireRole::User);
        assert_eq!(wire[3].content, "Tool Result: a.rs");
    }
}
