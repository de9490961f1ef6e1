//! 跨文件文本搜索：字面量或正则，按行输出 `path:line: text`

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::filesystem::{str_arg, SafeFs};
use crate::tools::Tool;

/// 单行预览最大字符数
const LINE_PREVIEW_CHARS: usize = 200;

enum Matcher {
    Literal(String),
    Regex(regex::Regex),
}

impl Matcher {
    fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Literal(p) => line.contains(p.as_str()),
            Matcher::Regex(re) => re.is_match(line),
        }
    }
}

pub struct SearchFilesTool {
    fs: SafeFs,
    max_results: usize,
    max_file_size: u64,
}

impl SearchFilesTool {
    pub fn new(fs: SafeFs) -> Self {
        Self {
            fs,
            max_results: 200,
            max_file_size: 1024 * 1024, // 1MB
        }
    }

    pub fn with_limits(mut self, max_results: usize, max_file_size: u64) -> Self {
        self.max_results = max_results;
        self.max_file_size = max_file_size;
        self
    }

    fn search_in_file(&self, path: &Path, matcher: &Matcher, out: &mut Vec<String>) {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return, // 跳过二进制或无法读取的文件
        };
        let rel = self.fs.relative(path);
        for (idx, line) in content.lines().enumerate() {
            if out.len() >= self.max_results {
                return;
            }
            if matcher.is_match(line) {
                let text: String = line.trim().chars().take(LINE_PREVIEW_CHARS).collect();
                out.push(format!("{}:{}: {}", rel, idx + 1, text));
            }
        }
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search file contents across the workspace. Returns matching lines as path:line: text."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Text or regular expression to search for." },
                "dirPath": { "type": "string", "description": "Relative directory or file to search (empty for root)." },
                "include": { "type": "string", "description": "Optional file name glob, e.g. \"*.rs\"." },
                "useRegex": { "type": "boolean", "description": "Treat pattern as a regular expression (default false)." }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let pattern = str_arg(&args, "pattern")?;
        let dir = args.get("dirPath").and_then(|v| v.as_str()).unwrap_or("");
        let use_regex = args
            .get("useRegex")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let include = match args.get("include").and_then(|v| v.as_str()) {
            Some(p) if !p.trim().is_empty() => Some(
                glob::Pattern::new(p.trim())
                    .map_err(|e| format!("Invalid glob pattern '{}': {}", p, e))?,
            ),
            _ => None,
        };
        let matcher = if use_regex {
            Matcher::Regex(
                regex::Regex::new(pattern).map_err(|e| format!("Invalid regex pattern: {}", e))?,
            )
        } else {
            Matcher::Literal(pattern.to_string())
        };
        tracing::info!(pattern = %pattern, dir = %dir, use_regex, "search_files tool execute");

        let base = if dir.trim().is_empty() || dir.trim() == "." {
            self.fs.root().to_path_buf()
        } else {
            self.fs.resolve(dir)?
        };

        let mut results = Vec::new();
        for entry in walkdir::WalkDir::new(&base)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // 跳过隐藏目录和构建产物
                let name = e.file_name().to_string_lossy();
                e.depth() == 0 || !(name.starts_with('.') || name == "target" || name == "node_modules")
            })
            .filter_map(|e| e.ok())
        {
            if results.len() >= self.max_results {
                break;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.metadata().map(|m| m.len() > self.max_file_size).unwrap_or(true) {
                continue;
            }
            if let Some(ref glob) = include {
                if !glob.matches(&entry.file_name().to_string_lossy()) {
                    continue;
                }
            }
            self.search_in_file(entry.path(), &matcher, &mut results);
        }

        if results.is_empty() {
            return Ok(format!("No matches found for pattern '{}'", pattern));
        }
        let mut output = format!("Found {} matches for pattern '{}'\n", results.len(), pattern);
        if results.len() >= self.max_results {
            output.push_str(&format!("(showing first {})\n", self.max_results));
        }
        output.push_str(&results.join("\n"));
        Ok(output)
    }
}
