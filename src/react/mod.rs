//! 认知层：回合循环、审批闸门、观察者事件、提示词组合

pub mod approval;
pub mod events;
pub mod loop_;
pub mod prompt;

pub use approval::{requires_approval, ApprovalGate, APPROVAL_REQUIRED_TOOLS};
pub use events::{AgentEvent, EventKind, EVENT_CHANNEL_CAPACITY};
pub use loop_::{rejection_text, EMPTY_RESPONSE_ERROR, MAX_ITERATIONS};
pub use prompt::{Mode, PromptComposer, DEFAULT_SKILLS};
