//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序吐出预设的 Decision；脚本耗尽后回显最后一条用户消息作为最终内容。
//! 记录每次调用看到的消息，便于断言推理次数与上下文。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::GatewayError;
use crate::llm::{Decision, LlmClient, ToolSpec};
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<Decision, GatewayError>>>,
    /// 非空时脚本耗尽后一直返回它
    repeat: Option<Decision>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定结果
    pub fn scripted(script: Vec<Result<Decision, GatewayError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// 每次都返回同一个 Decision
    pub fn repeating(decision: Decision) -> Self {
        Self {
            repeat: Some(decision),
            ..Self::default()
        }
    }

    /// 已发生的推理次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 第 n 次推理时看到的消息日志
    pub fn messages_at(&self, n: usize) -> Option<Vec<Message>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(n)
            .cloned()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn infer(
        &self,
        _system_prompt: &str,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<Decision, GatewayError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(result) = next {
            return result;
        }
        if let Some(ref decision) = self.repeat {
            return Ok(decision.clone());
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(Decision::content(format!("Echo from Mock: {}", last_user)))
    }
}
