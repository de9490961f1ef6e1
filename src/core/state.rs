//! 会话状态与终态
//!
//! SessionState 由 Orchestrator 独占持有（Mutex 内），锁只在同步片段内持有，不跨 await。
//! epoch 在 reset 时递增：旧 epoch 的循环醒来后发现不匹配即放弃，不再写入新会话。

use std::collections::HashSet;

use serde::Serialize;

use crate::memory::{ConversationLog, Message};

/// 单个会话的可变状态
#[derive(Debug)]
pub struct SessionState {
    pub log: ConversationLog,
    pub running: bool,
    /// 会话代号，reset 时 +1
    pub epoch: u64,
    /// 本会话已使用的 call_id
    pub call_ids: HashSet<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            log: ConversationLog::new(),
            running: false,
            epoch: 1,
            call_ids: HashSet::new(),
        }
    }
}

impl SessionState {
    /// 清空日志、运行标志与 call_id，进入新的 epoch
    pub fn reset(&mut self) {
        self.log.clear();
        self.running = false;
        self.call_ids.clear();
        self.epoch += 1;
    }

    /// 仅当 epoch 仍是当前会话时追加；返回是否追加成功
    pub fn append(&mut self, epoch: u64, msg: Message) -> bool {
        if self.epoch != epoch {
            return false;
        }
        self.log.push(msg);
        true
    }

    /// 登记 call_id；缺失或重复时分配新的 id
    pub fn claim_call_id(&mut self, proposed: &str) -> String {
        let id = if proposed.trim().is_empty() || self.call_ids.contains(proposed) {
            format!("call_{}", uuid::Uuid::new_v4().simple())
        } else {
            proposed.to_string()
        };
        self.call_ids.insert(id.clone());
        id
    }
}

/// run_session 的终态
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// 后端给出最终内容
    Completed,
    /// 15 次推理用尽仍未给出最终内容
    IterationLimit,
    /// 后端既无工具调用也无内容
    ProtocolError,
    /// 网关失败（配置 / 传输 / 状态码）
    Failed,
    /// 运行期间会话被 reset
    Abandoned,
    /// 已有循环在运行，本次调用被忽略
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_rejects_stale_epoch() {
        let mut state = SessionState::default();
        let epoch = state.epoch;
        assert!(state.append(epoch, Message::user("a")));
        state.reset();
        assert!(!state.append(epoch, Message::user("b")));
        assert!(state.log.is_empty());
    }

    #[test]
    fn test_claim_call_id_dedupes() {
        let mut state = SessionState::default();
        assert_eq!(state.claim_call_id("c1"), "c1");
        let second = state.claim_call_id("c1");
        assert_ne!(second, "c1");
        assert!(second.starts_with("call_"));
        assert!(state.claim_call_id("").starts_with("call_"));
    }
}
