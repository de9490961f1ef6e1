//! 会话编排器
//!
//! 独占持有 SessionState 与 ApprovalGate，对外只暴露 run_session / resolve_approval / reset 三个入口
//! 和只读快照；观察者通过有界 mpsc 通道接收事件。同一时刻最多一个循环在运行。

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::config::{AppConfig, FileConfigSource};
use crate::core::{SessionOutcome, SessionState};
use crate::llm::{LlmClient, ModelGateway};
use crate::memory::{Message, ToolCall};
use crate::react::loop_::{lock_state, TurnLoop};
use crate::react::{AgentEvent, ApprovalGate, EventKind, Mode, PromptComposer, EVENT_CHANNEL_CAPACITY};
use crate::tools::{default_registry, ToolRegistry};

pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    prompts: PromptComposer,
    state: Mutex<SessionState>,
    gate: ApprovalGate,
    events: mpsc::Sender<AgentEvent>,
}

/// 退出时释放 running 并清掉本会话遗留的审批槽位（future 被中途丢弃时会有残留）；
/// 会话已被 reset 时不碰新会话的状态
struct RunningGuard<'a> {
    state: &'a Mutex<SessionState>,
    gate: &'a ApprovalGate,
    epoch: u64,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        if state.epoch == self.epoch {
            state.running = false;
            // 锁顺序：先 state 后 gate
            self.gate.reset();
        }
    }
}

impl Orchestrator {
    /// 返回编排器与事件接收端
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        prompts: PromptComposer,
    ) -> (Self, mpsc::Receiver<AgentEvent>) {
        Self::with_capacity(llm, tools, prompts, EVENT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        prompts: PromptComposer,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let orchestrator = Self {
            llm,
            tools,
            prompts,
            state: Mutex::new(SessionState::default()),
            gate: ApprovalGate::new(),
            events: tx,
        };
        (orchestrator, rx)
    }

    fn turn_loop(&self, epoch: u64) -> TurnLoop<'_> {
        TurnLoop {
            llm: self.llm.as_ref(),
            tools: self.tools.as_ref(),
            prompts: &self.prompts,
            state: &self.state,
            gate: &self.gate,
            events: &self.events,
            epoch,
        }
    }

    /// 运行一次任务；已有循环在运行时静默返回 AlreadyRunning，不追加也不发事件
    pub async fn run_session(&self, text: &str, mode: &Mode) -> SessionOutcome {
        let (epoch, user_msg) = {
            let mut state = lock_state(&self.state);
            if state.running {
                tracing::debug!("run_session ignored: a loop is already running");
                return SessionOutcome::AlreadyRunning;
            }
            state.running = true;
            let msg = Message::user(text);
            state.log.push(msg.clone());
            (state.epoch, msg)
        };
        let _running = RunningGuard {
            state: &self.state,
            gate: &self.gate,
            epoch,
        };

        tracing::info!(session = epoch, mode = %mode, "session started");
        let turns = self.turn_loop(epoch);
        turns.emit(EventKind::Message(user_msg)).await;
        let outcome = turns.run(mode).await;
        tracing::info!(session = epoch, outcome = ?outcome, "session ended");
        turns.emit(EventKind::Ended(outcome.clone())).await;
        outcome
    }

    /// 回应待审批请求；没有请求时为空操作
    pub fn resolve_approval(&self, granted: bool) -> bool {
        self.gate.resolve(granted)
    }

    /// 清空日志、运行标志与待审批请求，进入新会话。已派发的推理或工具执行不会被取消。
    pub fn reset(&self) {
        let mut state = lock_state(&self.state);
        state.reset();
        self.gate.reset();
        tracing::info!(session = state.epoch, "session reset");
    }

    /// 当前会话代号
    pub fn session_id(&self) -> u64 {
        lock_state(&self.state).epoch
    }

    pub fn messages(&self) -> Vec<Message> {
        lock_state(&self.state).log.messages().to_vec()
    }

    pub fn is_running(&self) -> bool {
        lock_state(&self.state).running
    }

    pub fn pending_approval(&self) -> Option<ToolCall> {
        self.gate.pending()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }
}

/// 按配置组装：ModelGateway（每次推理重读配置文件）+ 默认工具集
pub fn create_orchestrator(
    cfg: &AppConfig,
    config_path: Option<PathBuf>,
) -> (Orchestrator, mpsc::Receiver<AgentEvent>) {
    let workspace = cfg
        .app
        .workspace_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::info!(workspace = %workspace.display(), provider = %cfg.llm.provider, "creating orchestrator");
    let llm: Arc<dyn LlmClient> = Arc::new(ModelGateway::new(Arc::new(FileConfigSource::new(
        config_path,
    ))));
    let tools = Arc::new(default_registry(Path::new(&workspace), &cfg.tools));
    Orchestrator::new(llm, tools, PromptComposer::default())
}
