//! 提示词组合：基础人设 + 当前模式指令 + 静态技能文本
//!
//! 工具清单、回复格式与语言由网关在每次推理时追加，这里只负责与模式相关的部分。

use std::fmt;
use std::str::FromStr;

/// 工作模式；未知名称按通用助手处理
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    Architect,
    #[default]
    Code,
    Ask,
    Debug,
    /// 其他任意名称
    Other(String),
}

impl Mode {
    pub fn instructions(&self) -> &'static str {
        match self {
            Mode::Architect => "Focus on high-level design and structural changes.",
            Mode::Code => "Focus on implementation, refactoring, and clean code.",
            Mode::Ask => "Focus on gathering information and explaining technical concepts.",
            Mode::Debug => "Focus on finding root causes and fixing bugs.",
            Mode::Other(_) => "Act as a general-purpose coding assistant.",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Architect => f.write_str("Architect"),
            Mode::Code => f.write_str("Code"),
            Mode::Ask => f.write_str("Ask"),
            Mode::Debug => f.write_str("Debug"),
            Mode::Other(name) => f.write_str(name),
        }
    }
}

/// 名称不区分大小写，任何输入都能得到一个模式
impl From<&str> for Mode {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "architect" => Mode::Architect,
            "code" => Mode::Code,
            "ask" => Mode::Ask,
            "debug" => Mode::Debug,
            _ => Mode::Other(s.trim().to_string()),
        }
    }
}

impl FromStr for Mode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Mode::from(s))
    }
}

const BASE_PROMPT: &str = "You are Aion, an advanced autonomous coding agent.
Follow the user's instructions carefully.

### CORE PRINCIPLES:
1. **Be Concise**: If the user just says \"Hi\", respond naturally without using tools.
2. **Context First**: Don't guess. Use tools like 'list_files_recursive' only if you need to know about the project to answer.
3. **Reasoning**: Use the 'thought' field for your logic. Don't repeat it in 'content'.
4. **Tool Use**: You MUST only use tools when necessary. If the user's task is completed, provide the final answer in 'content'.";

/// 默认技能文本：通用工程规范
pub const DEFAULT_SKILLS: &str = "### ENGINEERING STANDARDS:
- Read before you write: inspect the relevant files before changing them.
- Prefer small, targeted edits (apply_diff) over rewriting whole files.
- Keep the existing style, naming and structure of the project.
- Validate inputs at boundaries and handle errors explicitly.
- After changing code, run the project's build or tests when a command is available.";

/// 按模式组合 system prompt 的模式部分
#[derive(Clone, Debug)]
pub struct PromptComposer {
    skills: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_SKILLS)
    }
}

impl PromptComposer {
    pub fn new(skills: impl Into<String>) -> Self {
        Self {
            skills: skills.into(),
        }
    }

    pub fn compose(&self, mode: &Mode) -> String {
        let mut prompt = format!(
            "{}\n\n### CURRENT MODE: {}\n{}\n",
            BASE_PROMPT,
            mode,
            mode.instructions()
        );
        if !self.skills.trim().is_empty() {
            prompt.push('\n');
            prompt.push_str(self.skills.trim());
            prompt.push('\n');
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("debug".parse::<Mode>().unwrap(), Mode::Debug);
        assert_eq!("Architect".parse::<Mode>().unwrap(), Mode::Architect);
        assert_eq!(
            "Review".parse::<Mode>().unwrap(),
            Mode::Other("Review".to_string())
        );
        assert_eq!(Mode::default(), Mode::Code);
        assert_eq!(Mode::from("  ASK "), Mode::Ask);
        assert_eq!(Mode::from(" Review "), Mode::Other("Review".to_string()));
    }

    #[test]
    fn test_compose_includes_mode_and_skills() {
        let prompt = PromptComposer::default().compose(&Mode::Ask);
        assert!(prompt.starts_with("You are Aion"));
        assert!(prompt.contains("### CURRENT MODE: Ask\nFocus on gathering information"));
        assert!(prompt.contains("### ENGINEERING STANDARDS:"));

        let prompt = PromptComposer::new("").compose(&"Review".parse().unwrap());
        assert!(prompt.ends_with("### CURRENT MODE: Review\nAct as a general-purpose coding assistant.\n"));
    }
}
