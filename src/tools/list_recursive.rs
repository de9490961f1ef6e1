//! 递归文件枚举：include / exclude glob 过滤，输出相对工作区根的路径，每行一个

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use serde_json::Value;

use crate::tools::filesystem::SafeFs;
use crate::tools::Tool;

/// 始终跳过的目录
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

pub struct ListFilesRecursiveTool {
    fs: SafeFs,
    max_results: usize,
}

impl ListFilesRecursiveTool {
    pub fn new(fs: SafeFs) -> Self {
        Self {
            fs,
            max_results: 5000,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// 参数既可是字符串也可是字符串数组
fn patterns(args: &Value, key: &str) -> Result<Vec<Pattern>, String> {
    let raw: Vec<&str> = match args.get(key) {
        None | Some(Value::Null) => vec![],
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str()).collect(),
        Some(_) => return Err(format!("{} must be a string or an array of strings", key)),
    };
    raw.into_iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| Pattern::new(p.trim()).map_err(|e| format!("Invalid glob pattern '{}': {}", p, e)))
        .collect()
}

/// 相对路径或文件名任一匹配即可（"*.rs" 能匹配 "src/a.rs"）
fn matches_any(patterns: &[Pattern], rel: &str, file_name: &str) -> bool {
    let opts = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    patterns
        .iter()
        .any(|p| p.matches_with(rel, opts) || p.matches_with(file_name, opts))
}

#[async_trait]
impl Tool for ListFilesRecursiveTool {
    fn name(&self) -> &str {
        "list_files_recursive"
    }

    fn description(&self) -> &str {
        "Recursively list files under a directory. Returns workspace-relative paths, one per line. \
         Hidden directories, target and node_modules are skipped."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "dirPath": { "type": "string", "description": "Relative directory to start from (empty for root)." },
                "include": { "type": "array", "items": { "type": "string" }, "description": "Glob patterns a file must match, e.g. [\"*.rs\"]." },
                "exclude": { "type": "array", "items": { "type": "string" }, "description": "Glob patterns to leave out." }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let dir = args.get("dirPath").and_then(|v| v.as_str()).unwrap_or("");
        let include = patterns(&args, "include")?;
        let exclude = patterns(&args, "exclude")?;
        tracing::info!(dir = %dir, include = include.len(), exclude = exclude.len(), "list_files_recursive tool execute");

        let base = if dir.trim().is_empty() || dir.trim() == "." {
            self.fs.root().to_path_buf()
        } else {
            self.fs.resolve(dir)?
        };

        let mut files = Vec::new();
        let mut truncated = false;
        // 按名字有序遍历，截断时保留的文件集合与平台无关
        for entry in walkdir::WalkDir::new(&base)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') && !SKIPPED_DIRS.contains(&&*name)
            })
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = self.fs.relative(entry.path());
            let file_name = entry.file_name().to_string_lossy();
            if !include.is_empty() && !matches_any(&include, &rel, &file_name) {
                continue;
            }
            if matches_any(&exclude, &rel, &file_name) {
                continue;
            }
            if files.len() >= self.max_results {
                truncated = true;
                break;
            }
            files.push(rel);
        }

        if files.is_empty() {
            return Ok("No files found.".to_string());
        }
        files.sort();
        if truncated {
            files.push(format!("... (truncated at {} files)", self.max_results));
        }
        Ok(files.join("\n"))
    }
}
