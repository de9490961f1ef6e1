//! 记忆层：会话消息日志（仅进程内，不跨重启持久化）

pub mod conversation;

pub use conversation::{ConversationLog, Message, Role, ToolCall, ToolResult};
