//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AION__*` 覆盖（双下划线表示嵌套，如 `AION__LLM__PROVIDER=OpenAI`）。
//! [llm] 段在每次推理前经 ConfigSource 重新读取，外部修改在下一回合生效，无需重建对象。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::GatewayError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSettings,
    pub tools: ToolsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    /// 工具沙箱根目录，未设置时用当前目录
    pub workspace_root: Option<PathBuf>,
}

/// [llm] 段：提供方、凭据、模型、端点、语言与附加指令
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    /// Gemini / Anthropic / OpenAI / DeepSeek / Custom
    pub provider: String,
    pub api_key: String,
    /// 为空时使用提供方默认模型
    pub model: String,
    /// Custom 端点；非空时也覆盖其他提供方的默认 base URL
    pub custom_url: String,
    /// 回复语言
    pub language: String,
    /// 追加到 system prompt 的自由文本
    pub custom_instructions: String,
    pub request_timeout_secs: u64,
    /// Anthropic 方言的 max_tokens
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "Gemini".to_string(),
            api_key: String::new(),
            model: String::new(),
            custom_url: String::new(),
            language: "en".to_string(),
            custom_instructions: String::new(),
            request_timeout_secs: 120,
            max_tokens: 4096,
        }
    }
}

/// [tools] 段：超时与读取上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    /// run_command 的命令超时（秒）
    pub command_timeout_secs: u64,
    /// read_file 最大读取字节数
    pub max_read_bytes: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 60,
            command_timeout_secs: 120,
            max_read_bytes: 1024 * 1024,
        }
    }
}

/// 从 config 目录加载配置，环境变量 AION__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AION__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AION")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 推理配置来源：网关在每次 infer 时调用一次，不做缓存
pub trait ConfigSource: Send + Sync {
    fn llm_settings(&self) -> Result<LlmSettings, GatewayError>;
}

/// 每次从磁盘与环境变量重新加载
#[derive(Debug, Clone, Default)]
pub struct FileConfigSource {
    path: Option<PathBuf>,
}

impl FileConfigSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ConfigSource for FileConfigSource {
    fn llm_settings(&self) -> Result<LlmSettings, GatewayError> {
        load_config(self.path.clone())
            .map(|cfg| cfg.llm)
            .map_err(|e| GatewayError::Config(format!("Failed to load configuration: {}", e)))
    }
}

/// 固定配置（嵌入方或测试直接给出）
impl ConfigSource for LlmSettings {
    fn llm_settings(&self) -> Result<LlmSettings, GatewayError> {
        Ok(self.clone())
    }
}
