//! Decision：一次推理的结构化输出，以及从模型原始文本到 Decision 的解析
//!
//! 解析分三级回退：
//! 1. 整段文本严格按 JSON 解析；
//! 2. 取第一个括号平衡的 `{...}` 片段再解析；
//! 3. 都失败时降级为 `{content: 原文}`，保证非空的畸形回复也能送达用户。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use crate::memory::ToolCall;

/// 推理输出：可选 thought、有序工具调用（可能为空）、可选最终内容
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decision {
    pub thought: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub content: Option<String>,
}

impl Decision {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::default()
        }
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    /// 非空的最终内容
    pub fn final_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Deserialize)]
struct RawDecision {
    #[serde(default)]
    thought: Option<Value>,
    #[serde(default, rename = "toolCalls", alias = "tool_calls")]
    tool_calls: Option<Vec<RawToolCall>>,
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Deserialize)]
struct RawToolCall {
    name: String,
    #[serde(default, alias = "arguments", alias = "parameters")]
    args: Value,
    #[serde(default, rename = "callId", alias = "call_id", alias = "id")]
    call_id: Option<String>,
}

/// 文本字段：字符串原样保留，空串视为缺失，其他 JSON 值序列化为文本
fn text_field(v: Option<Value>) -> Option<String> {
    match v? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// 参数归一化：缺失为 {}，JSON 字符串（OpenAI 风格）解码
fn normalize_args(args: Value) -> Value {
    match args {
        Value::Null => Value::Object(Default::default()),
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        other => other,
    }
}

impl From<RawDecision> for Decision {
    fn from(raw: RawDecision) -> Self {
        let tool_calls = raw
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                name: tc.name,
                args: normalize_args(tc.args),
                call_id: tc.call_id.unwrap_or_default(),
            })
            .collect();
        Self {
            thought: text_field(raw.thought),
            tool_calls,
            content: text_field(raw.content),
        }
    }
}

/// 从 start 处的 `{` 开始扫描，返回括号平衡的片段（跳过字符串字面量中的括号）
fn balanced_span_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 依次以每个 `{` 为起点的平衡片段；起点处不闭合时跳到下一个 `{`
fn json_object_spans(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices('{')
        .filter_map(move |(start, _)| balanced_span_at(text, start))
}

/// 返回第一个括号平衡的 `{...}` 片段
pub fn first_json_object(text: &str) -> Option<&str> {
    json_object_spans(text).next()
}

/// 将模型原始文本解析为 Decision，永不失败
pub fn parse_decision(text: &str) -> Decision {
    if let Ok(raw) = serde_json::from_str::<RawDecision>(text) {
        return raw.into();
    }
    for span in json_object_spans(text) {
        if let Ok(raw) = serde_json::from_str::<RawDecision>(span) {
            tracing::debug!("decision parsed from embedded JSON span");
            return raw.into();
        }
    }
    tracing::debug!(len = text.len(), "decision is not JSON, wrapping as content");
    Decision {
        content: Some(text.to_string()),
        ..Decision::default()
    }
}

/// 回复格式（仅用于生成 Schema 注入 system prompt）
#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ReplyFormat {
    /// 你的推理过程，不要在 content 中重复
    thought: Option<String>,
    /// 需要执行的工具调用，按顺序执行；任务完成时留空
    tool_calls: Option<Vec<ReplyToolCall>>,
    /// 给用户的最终回答；有工具调用时留空
    content: Option<String>,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ReplyToolCall {
    /// 工具名，必须是 Available tools 中的一个
    name: String,
    /// 工具参数，符合该工具的 parameters schema
    args: HashMap<String, Value>,
    /// 本次调用的唯一 id
    call_id: String,
}

/// 回复格式的 JSON Schema 字符串，拼入 system prompt
pub fn decision_schema_json() -> String {
    let schema = schema_for!(ReplyFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
