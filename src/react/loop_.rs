//! 有界回合循环
//!
//! 每轮：组合提示词 -> Busy(true) -> 推理 -> Busy(false) -> thought / 工具调用 / 最终内容。
//! 工具调用严格按返回顺序逐个执行；需审批的调用先登记到 ApprovalGate 并等待结果，拒绝只影响该调用。
//! 每次 await 之后都核对 epoch，会话被 reset 的循环以 Abandoned 退出，不再写日志也不再发消息事件。

use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::core::{SessionOutcome, SessionState};
use crate::llm::{LlmClient, ToolSpec};
use crate::memory::{Message, ToolCall};
use crate::react::approval::{requires_approval, ApprovalGate};
use crate::react::events::{AgentEvent, EventKind};
use crate::react::prompt::{Mode, PromptComposer};
use crate::tools::ToolRegistry;

/// 单次 run_session 最多推理次数
pub const MAX_ITERATIONS: usize = 15;

/// 既无工具调用也无内容时的协议错误
pub const EMPTY_RESPONSE_ERROR: &str = "Execution Error: The AI returned an empty response. \
     This might be due to a parsing error or context window limits.";

pub fn rejection_text(tool_name: &str) -> String {
    format!("Tool {} execution rejected by user.", tool_name)
}

pub(crate) fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// 一次会话运行所需的全部协作者，绑定到启动时的 epoch
pub(crate) struct TurnLoop<'a> {
    pub llm: &'a dyn LlmClient,
    pub tools: &'a ToolRegistry,
    pub prompts: &'a PromptComposer,
    pub state: &'a Mutex<SessionState>,
    pub gate: &'a ApprovalGate,
    pub events: &'a mpsc::Sender<AgentEvent>,
    pub epoch: u64,
}

/// Err 表示循环必须以该终态结束（目前只有 Abandoned）
type Step = Result<(), SessionOutcome>;

impl TurnLoop<'_> {
    pub async fn emit(&self, kind: EventKind) {
        let ev = AgentEvent {
            session: self.epoch,
            kind,
        };
        // 观察者已关闭时丢弃事件
        let _ = self.events.send(ev).await;
    }

    fn is_current(&self) -> bool {
        lock_state(self.state).epoch == self.epoch
    }

    /// 追加到日志并通知观察者；锁在 emit 之前释放
    pub async fn record(&self, msg: Message) -> Step {
        let appended = lock_state(self.state).append(self.epoch, msg.clone());
        if !appended {
            return Err(SessionOutcome::Abandoned);
        }
        self.emit(EventKind::Message(msg)).await;
        Ok(())
    }

    pub async fn run(&self, mode: &Mode) -> SessionOutcome {
        match self.turns(mode).await {
            Ok(outcome) | Err(outcome) => outcome,
        }
    }

    async fn turns(&self, mode: &Mode) -> Result<SessionOutcome, SessionOutcome> {
        let manifest: Vec<ToolSpec> = self.tools.manifest();

        for iteration in 1..=MAX_ITERATIONS {
            let system_prompt = self.prompts.compose(mode);
            let history = {
                let state = lock_state(self.state);
                if state.epoch != self.epoch {
                    return Err(SessionOutcome::Abandoned);
                }
                state.log.messages().to_vec()
            };

            tracing::debug!(iteration, messages = history.len(), "inference dispatch");
            self.emit(EventKind::Busy(true)).await;
            let result = self.llm.infer(&system_prompt, &history, &manifest).await;
            self.emit(EventKind::Busy(false)).await;

            if !self.is_current() {
                tracing::warn!(epoch = self.epoch, "session reset during inference; loop abandoned");
                return Err(SessionOutcome::Abandoned);
            }

            let decision = match result {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(error = %e, "inference failed");
                    self.record(Message::assistant(format!("Execution Error: {}", e)))
                        .await?;
                    return Ok(SessionOutcome::Failed);
                }
            };

            if let Some(thought) = decision.thought.as_deref().filter(|t| !t.trim().is_empty()) {
                let content = decision.content.as_deref().unwrap_or("");
                if thought.trim() != content.trim() || !decision.tool_calls.is_empty() {
                    self.record(Message::thought(thought)).await?;
                }
            }

            if !decision.tool_calls.is_empty() {
                for call in decision.tool_calls {
                    self.dispatch(call).await?;
                }
                continue;
            }

            if let Some(content) = decision.final_content() {
                self.record(Message::assistant(content)).await?;
                return Ok(SessionOutcome::Completed);
            }

            tracing::warn!(iteration, "backend returned neither tool calls nor content");
            self.record(Message::assistant(EMPTY_RESPONSE_ERROR)).await?;
            return Ok(SessionOutcome::ProtocolError);
        }

        tracing::warn!(max = MAX_ITERATIONS, "iteration budget exhausted without final content");
        Ok(SessionOutcome::IterationLimit)
    }

    /// 处理单个工具调用：必要时等待审批，然后执行并记录意图与结果
    async fn dispatch(&self, call: ToolCall) -> Step {
        let (call, approval) = {
            let mut state = lock_state(self.state);
            if state.epoch != self.epoch {
                return Err(SessionOutcome::Abandoned);
            }
            let call_id = state.claim_call_id(&call.call_id);
            let call = ToolCall { call_id, ..call };
            // 在会话锁内登记，reset 不会与登记交错
            let approval = requires_approval(&call.name).then(|| self.gate.request(call.clone()));
            (call, approval)
        };

        if let Some(rx) = approval {
            self.record(Message::approval_request(call.clone())).await?;
            match rx.await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(tool = %call.name, "tool call rejected by user");
                    return self
                        .record(Message::tool_result(call.call_id, rejection_text(&call.name)))
                        .await;
                }
                Err(_) => {
                    tracing::warn!(tool = %call.name, "approval abandoned by reset");
                    return Err(SessionOutcome::Abandoned);
                }
            }
        }

        self.record(Message::tool_intent(call.clone())).await?;
        let output = self.tools.execute(&call.name, call.args).await;
        self.record(Message::tool_result(call.call_id, output)).await
    }
}
