//! 会话消息日志
//!
//! 消息一经追加即不可变；日志只追加、保持插入顺序，由 Orchestrator 独占写入。
//! 同一份日志既驱动下一次推理，也是观察者看到的完整记录。

use serde::{Deserialize, Serialize};

/// 消息角色：user / assistant / tool（工具结果）/ thought（推理过程）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
    Thought,
}

/// 后端要求执行的一次工具调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub name: String,
    pub args: serde_json::Value,
    pub call_id: String,
}

/// 工具执行结果，call_id 对应此前出现过的 ToolCall
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub call_id: String,
    pub result: String,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_approval: bool,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call: None,
            tool_result: None,
            requires_approval: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn thought(content: impl Into<String>) -> Self {
        Self::plain(Role::Thought, content)
    }

    /// 审批请求：assistant 消息，携带待审批的调用
    pub fn approval_request(call: ToolCall) -> Self {
        Self {
            content: format!("Aion wants to use **{}**. Do you approve?", call.name),
            tool_call: Some(call),
            requires_approval: true,
            ..Self::plain(Role::Assistant, "")
        }
    }

    /// 调用意图：记录即将执行的工具调用
    pub fn tool_intent(call: ToolCall) -> Self {
        let args = serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".to_string());
        Self {
            content: format!("I will use tool: {}({})", call.name, args),
            tool_call: Some(call),
            ..Self::plain(Role::Assistant, "")
        }
    }

    /// 工具结果：content 与 tool_result.result 均为工具原始输出
    pub fn tool_result(call_id: impl Into<String>, result: impl Into<String>) -> Self {
        let result = result.into();
        Self {
            tool_result: Some(ToolResult {
                call_id: call_id.into(),
                result: result.clone(),
            }),
            ..Self::plain(Role::Tool, result)
        }
    }
}

/// 只追加的消息日志
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_keeps_raw_output() {
        let msg = Message::tool_result("c1", "a.rs\nb.rs");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.content, "a.rs\nb.rs");
        assert_eq!(msg.tool_result.unwrap().result, "a.rs\nb.rs");
    }

    #[test]
    fn test_approval_request_carries_call() {
        let call = ToolCall {
            name: "run_command".to_string(),
            args: serde_json::json!({"command": "ls"}),
            call_id: "c1".to_string(),
        };
        let msg = Message::approval_request(call.clone());
        assert!(msg.requires_approval);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_call, Some(call));
        assert!(msg.content.contains("run_command"));
    }

    #[test]
    fn test_serialized_shape() {
        let v = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(v, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
