//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! execute 永不向外抛错：未知工具、工具内部错误、超时都渲染为文本，交给下一轮推理；
//! 每次调用输出结构化审计日志（JSON）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::timeout;

use crate::llm::ToolSpec;

/// 默认单次工具调用超时（秒）
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（Decision 中 toolCalls[].name）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema，默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具；Err 中的文本会被注册表包装后交给模型
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，保留注册顺序用于生成清单
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
    timeout: Duration,
    /// 个别工具的超时覆盖（如自带命令超时的 run_command）
    timeout_overrides: HashMap<String, Duration>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            timeout_overrides: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// 注册工具；同名工具后注册者覆盖先注册者
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    /// 注册工具并为其单独指定超时
    pub fn register_with_timeout(&mut self, tool: impl Tool + 'static, secs: u64) {
        let name = tool.name().to_string();
        self.register(tool);
        self.timeout_overrides.insert(name, Duration::from_secs(secs));
    }

    /// 该工具实际生效的超时
    pub fn timeout_for(&self, name: &str) -> Duration {
        self.timeout_overrides
            .get(name)
            .copied()
            .unwrap_or(self.timeout)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// 交给后端的工具清单（不含执行器）
    pub fn manifest(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// 执行指定工具，总是返回文本
    pub async fn execute(&self, name: &str, args: Value) -> String {
        let Some(tool) = self.lookup(name) else {
            audit(name, "not_found", Duration::ZERO, &args);
            return format!("Error: Tool {} not found", name);
        };

        let limit = self.timeout_for(name);
        let start = Instant::now();
        let preview_args = args.clone();
        let result = timeout(limit, tool.execute(args)).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(output)) => {
                audit(name, "ok", elapsed, &preview_args);
                output
            }
            Ok(Err(e)) => {
                audit(name, "error", elapsed, &preview_args);
                format!("Error executing tool {}: {}", name, e)
            }
            Err(_) => {
                audit(name, "timeout", elapsed, &preview_args);
                format!(
                    "Error executing tool {}: timed out after {}s",
                    name,
                    limit.as_secs()
                )
            }
        }
    }
}

fn audit(tool: &str, outcome: &str, elapsed: Duration, args: &Value) {
    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": tool,
        "ok": outcome == "ok",
        "outcome": outcome,
        "duration_ms": elapsed.as_millis() as u64,
        "args_preview": args_preview(args),
    });
    tracing::info!(audit = %audit, "tool");
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
