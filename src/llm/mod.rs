//! LLM 层：客户端抽象、Decision 解析、三种线协议（generateContent / messages / chat-completions）与 Mock

pub mod anthropic;
pub mod decision;
pub mod gateway;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod traits;

pub use decision::{decision_schema_json, first_json_object, parse_decision, Decision};
pub use gateway::{compose_system_prompt, Backend, ModelGateway};
pub use mock::MockLlmClient;
pub use provider::Provider;
pub use traits::{to_wire_messages, LlmClient, ToolSpec, WireMessage, WireRole};
