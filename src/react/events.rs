//! 观察者事件：消息、忙碌切换、会话终态
//!
//! 事件顺序与日志追加顺序一致；每个事件带会话代号（epoch），观察者可据此丢弃过期会话的事件。

use serde::Serialize;

use crate::core::SessionOutcome;
use crate::memory::Message;

/// 事件通道容量
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct AgentEvent {
    /// 产生该事件的会话代号
    pub session: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    /// 新追加到日志的消息（只读副本）
    Message(Message),
    /// 推理调用前后的忙碌 / 空闲切换
    Busy(bool),
    /// 本次 run_session 的终态
    Ended(SessionOutcome),
}

impl AgentEvent {
    pub fn message(&self) -> Option<&Message> {
        match self.kind {
            EventKind::Message(ref m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let ev = AgentEvent {
            session: 3,
            kind: EventKind::Busy(true),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v, serde_json::json!({"session": 3, "type": "busy", "data": true}));

        let ev = AgentEvent {
            session: 1,
            kind: EventKind::Ended(SessionOutcome::IterationLimit),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["data"], "iteration_limit");
    }
}
