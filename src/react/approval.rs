//! 审批闸门：单槽位的 oneshot 会合点
//!
//! 循环对需审批的调用 `request`，拿到 Receiver 后 await；观察者 `resolve(bool)` 完成它。
//! `reset` 直接丢弃 Sender，等待方收到 RecvError，视为会话已放弃，不会在之后悄悄恢复。

use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::memory::ToolCall;

/// 必须经用户批准才能执行的工具（写文件、打补丁、执行命令）
pub const APPROVAL_REQUIRED_TOOLS: &[&str] = &["write_to_file", "apply_diff", "run_command"];

pub fn requires_approval(tool_name: &str) -> bool {
    APPROVAL_REQUIRED_TOOLS.contains(&tool_name)
}

struct Pending {
    call: ToolCall,
    tx: oneshot::Sender<bool>,
}

#[derive(Default)]
pub struct ApprovalGate {
    slot: Mutex<Option<Pending>>,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一次待审批调用；槽位中若已有旧请求则将其丢弃
    pub fn request(&self, call: ToolCall) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(Pending { call, tx });
        if previous.is_some() {
            tracing::warn!("approval slot was occupied; previous request dropped");
        }
        rx
    }

    /// 完成当前请求；没有待审批请求时为空操作，返回 false
    pub fn resolve(&self, granted: bool) -> bool {
        let pending = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        match pending {
            Some(p) => {
                tracing::info!(tool = %p.call.name, granted, "approval resolved");
                // 接收方已消失（会话被放弃）时发送失败，无需处理
                let _ = p.tx.send(granted);
                true
            }
            None => false,
        }
    }

    /// 丢弃当前请求而不完成它
    pub fn reset(&self) {
        if let Some(p) = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take() {
            tracing::info!(tool = %p.call.name, "pending approval discarded");
        }
    }

    /// 当前等待审批的调用
    pub fn pending(&self) -> Option<ToolCall> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|p| p.call.clone())
    }
}
