//! 错误类型
//!
//! 只有推理网关边界与顶层循环会终止一次会话；工具层与解析层的失败都降级为文本值。

use thiserror::Error;

/// 推理网关错误：配置、HTTP 状态、传输、响应格式。对当前回合是致命的。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// 缺少 API Key / 端点、未知 provider 等
    #[error("{0}")]
    Config(String),

    /// 后端返回非 2xx
    #[error("{provider} Error: {status} - {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// 连接失败、超时等
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    /// 2xx 但响应体不是 JSON
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },
}

/// 工具内部错误；在注册表边界被渲染为 "Error executing tool <name>: <message>"
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Path escapes the workspace: {0}")]
    PathEscape(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Forbidden pattern: {0}")]
    Forbidden(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<ToolError> for String {
    fn from(e: ToolError) -> Self {
        e.to_string()
    }
}
