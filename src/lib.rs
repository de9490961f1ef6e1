//! Aion - 带人工审批的编码智能体核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量），推理配置每回合重读
//! - **core**: 错误类型、会话状态、编排器（run_session / resolve_approval / reset）
//! - **llm**: LlmClient 抽象、Decision 解析、三种线协议网关与 Mock
//! - **memory**: 消息模型与只追加的会话日志
//! - **react**: 有界回合循环、审批闸门、观察者事件、提示词组合
//! - **tools**: Tool trait、注册表与沙箱化的工作区工具

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod react;
pub mod tools;

pub use crate::core::{Orchestrator, SessionOutcome};
pub use crate::react::{AgentEvent, EventKind, Mode};
