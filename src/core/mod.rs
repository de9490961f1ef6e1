//! 核心层：错误类型、会话状态、编排器

pub mod error;
pub mod orchestrator;
pub mod state;

pub use error::{GatewayError, ToolError};
pub use orchestrator::{create_orchestrator, Orchestrator};
pub use state::{SessionOutcome, SessionState};
