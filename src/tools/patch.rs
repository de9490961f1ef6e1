//! apply_diff：搜索并替换文件中的代码块
//!
//! 先精确匹配第一次出现；失败后按行忽略行首缩进再匹配一次。找不到则报错，文件不变。

use std::ops::Range;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::filesystem::{str_arg, SafeFs};
use crate::tools::Tool;

pub struct ApplyDiffTool {
    fs: SafeFs,
    max_file_size: u64,
}

impl ApplyDiffTool {
    pub fn new(fs: SafeFs) -> Self {
        Self {
            fs,
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// 每行的字节范围（不含换行符）
fn line_spans(content: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for piece in content.split_inclusive('\n') {
        let body = piece.trim_end_matches('\n').trim_end_matches('\r');
        spans.push(start..start + body.len());
        start += piece.len();
    }
    spans
}

/// 忽略行首空白逐行比较，返回被匹配块在原文中的字节范围
fn find_indentation_tolerant(content: &str, search: &str) -> Option<Range<usize>> {
    let wanted: Vec<&str> = search
        .lines()
        .map(|l| l.trim_start().trim_end_matches('\r'))
        .collect();
    if wanted.is_empty() || wanted.iter().all(|l| l.is_empty()) {
        return None;
    }
    let spans = line_spans(content);
    if spans.len() < wanted.len() {
        return None;
    }
    (0..=spans.len() - wanted.len()).find_map(|i| {
        let hit = wanted
            .iter()
            .enumerate()
            .all(|(j, w)| content[spans[i + j].clone()].trim_start() == *w);
        hit.then(|| spans[i].start..spans[i + wanted.len() - 1].end)
    })
}

fn line_of(content: &str, byte: usize) -> usize {
    content[..byte].matches('\n').count() + 1
}

/// 返回替换后的全文与起始行号
fn apply(content: &str, search: &str, replace: &str) -> Option<(String, usize)> {
    let range = match content.find(search) {
        Some(pos) => pos..pos + search.len(),
        None => find_indentation_tolerant(content, search)?,
    };
    let line = line_of(content, range.start);
    let mut out = String::with_capacity(content.len() + replace.len());
    out.push_str(&content[..range.start]);
    out.push_str(replace);
    out.push_str(&content[range.end..]);
    Some((out, line))
}

#[async_trait]
impl Tool for ApplyDiffTool {
    fn name(&self) -> &str {
        "apply_diff"
    }

    fn description(&self) -> &str {
        "Replace a block of text in a file. 'search' must match existing content exactly \
         (leading indentation may differ); only the first occurrence is replaced."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string", "description": "Relative path to the file." },
                "search": { "type": "string", "description": "Existing text to find." },
                "replace": { "type": "string", "description": "Text to put in its place." }
            },
            "required": ["filePath", "search", "replace"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let path = str_arg(&args, "filePath")?;
        let search = str_arg(&args, "search")?;
        let replace = str_arg(&args, "replace")?;
        if search.is_empty() {
            return Err("search must not be empty".to_string());
        }
        tracing::info!(path = %path, "apply_diff tool execute");

        let content = self.fs.read_file(path, self.max_file_size)?;
        let (updated, line) = apply(&content, search, replace)
            .ok_or_else(|| format!("Search block not found in {}", path))?;
        self.fs.write_file(path, &updated)?;
        Ok(format!("Successfully applied diff to {} at line {}", path, line))
    }
}
