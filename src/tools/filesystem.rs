//! 沙箱文件系统工具
//!
//! SafeFs 绑定工作区根目录，所有路径必须落在根下（禁止 ../ 与符号链接逃逸）；
//! read_file / write_to_file / list_dir 基于 SafeFs。

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::ToolError;
use crate::tools::Tool;

/// 沙箱文件系统：绑定根目录，resolve 校验路径在根下
#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

impl SafeFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// 词法拼接：处理 . 与 ..，越过根目录即视为逃逸
    fn join(&self, path: &str) -> Result<PathBuf, ToolError> {
        let raw = Path::new(path.trim());
        let rel = if raw.is_absolute() {
            raw.strip_prefix(&self.root_dir)
                .map_err(|_| ToolError::PathEscape(path.to_string()))?
        } else {
            raw
        };

        let mut out = self.root_dir.clone();
        let mut depth = 0usize;
        for comp in rel.components() {
            match comp {
                Component::CurDir => {}
                Component::Normal(c) => {
                    out.push(c);
                    depth += 1;
                }
                Component::ParentDir if depth > 0 => {
                    out.pop();
                    depth -= 1;
                }
                _ => return Err(ToolError::PathEscape(path.to_string())),
            }
        }
        Ok(out)
    }

    fn check_inside(&self, canonical: &Path, path: &str) -> Result<(), ToolError> {
        if canonical.starts_with(&self.root_dir) {
            Ok(())
        } else {
            Err(ToolError::PathEscape(path.to_string())) // 如指向根外的符号链接
        }
    }

    /// 解析已存在的路径
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let full = self.join(path)?;
        let canonical = full
            .canonicalize()
            .map_err(|_| ToolError::NotFound(path.to_string()))?;
        self.check_inside(&canonical, path)?;
        Ok(canonical)
    }

    /// 解析可能尚不存在的写入目标：最近的已存在祖先必须在根下
    pub fn resolve_for_write(&self, path: &str) -> Result<PathBuf, ToolError> {
        let full = self.join(path)?;
        if full == self.root_dir {
            return Err(ToolError::InvalidArgs("filePath must name a file".to_string()));
        }
        let mut ancestor = full.as_path();
        while !ancestor.exists() {
            match ancestor.parent() {
                Some(p) => ancestor = p,
                None => break,
            }
        }
        let canonical = ancestor.canonicalize()?;
        self.check_inside(&canonical, path)?;
        Ok(full)
    }

    /// 相对根目录的路径，统一使用 / 分隔
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root_dir).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn read_file(&self, path: &str, max_bytes: u64) -> Result<String, ToolError> {
        let resolved = self.resolve(path)?;
        let size = std::fs::metadata(&resolved)?.len();
        if size > max_bytes {
            return Err(ToolError::InvalidArgs(format!(
                "File too large ({} bytes, limit {})",
                size, max_bytes
            )));
        }
        Ok(std::fs::read_to_string(&resolved)?)
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<(), ToolError> {
        let target = self.resolve_for_write(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
        Ok(())
    }

    pub fn list_dir(&self, path: &str) -> Result<Vec<String>, ToolError> {
        let base = if path.trim().is_empty() || path.trim() == "." {
            self.root_dir.clone()
        } else {
            self.resolve(path)?
        };
        let mut entries = Vec::new();
        for e in std::fs::read_dir(&base)? {
            let e = e?;
            let name = e.file_name().to_string_lossy().to_string();
            let kind = if e.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                "dir"
            } else {
                "file"
            };
            entries.push(format!("{} ({})", name, kind));
        }
        entries.sort();
        Ok(entries)
    }
}

pub(crate) fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing required parameter: {}", key))
}

/// read_file：读取文件内容
pub struct ReadFileTool {
    fs: SafeFs,
    max_bytes: u64,
}

impl ReadFileTool {
    pub fn new(fs: SafeFs, max_bytes: u64) -> Self {
        Self { fs, max_bytes }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file in the workspace."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string", "description": "Relative path to the file." }
            },
            "required": ["filePath"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let path = str_arg(&args, "filePath")?;
        tracing::info!(path = %path, "read_file tool execute");
        Ok(self.fs.read_file(path, self.max_bytes)?)
    }
}

/// write_to_file：写入或覆盖文件（需审批）
pub struct WriteFileTool {
    fs: SafeFs,
}

impl WriteFileTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_to_file"
    }

    fn description(&self) -> &str {
        "Write or overwrite a file in the workspace."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string", "description": "Relative path to the file." },
                "content": { "type": "string", "description": "Content to write." }
            },
            "required": ["filePath", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let path = str_arg(&args, "filePath")?;
        let content = str_arg(&args, "content")?;
        tracing::info!(path = %path, bytes = content.len(), "write_to_file tool execute");
        self.fs.write_file(path, content)?;
        Ok(format!("Successfully wrote to {}", path))
    }
}

/// list_dir：列出单层目录
pub struct ListDirTool {
    fs: SafeFs,
}

impl ListDirTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List files and directories in a given path."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "dirPath": { "type": "string", "description": "Relative path to the directory (empty for root)." }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let path = args.get("dirPath").and_then(|v| v.as_str()).unwrap_or("");
        tracing::info!(path = %path, "list_dir tool execute");
        Ok(self.fs.list_dir(path)?.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let fs = SafeFs::new(dir.path());
        let write = WriteFileTool::new(fs.clone());
        let out = write
            .execute(serde_json::json!({"filePath": "src/new/mod.rs", "content": "pub fn a() {}"}))
            .await
            .unwrap();
        assert_eq!(out, "Successfully wrote to src/new/mod.rs");

        let read = ReadFileTool::new(fs, 1024);
        let content = read
            .execute(serde_json::json!({"filePath": "./src/new/mod.rs"}))
            .await
            .unwrap();
        assert_eq!(content, "pub fn a() {}");
    }

    #[test]
    fn test_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fs = SafeFs::new(dir.path());
        assert!(matches!(fs.resolve_for_write("../outside.txt"), Err(ToolError::PathEscape(_))));
        assert!(matches!(fs.resolve("a/../../etc/passwd"), Err(ToolError::PathEscape(_))));
        assert!(matches!(fs.resolve_for_write("/etc/passwd"), Err(ToolError::PathEscape(_))));
        assert!(fs.resolve_for_write("a/../b.txt").is_ok());
    }

    #[tokio::test]
    async fn test_read_limits_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
        let read = ReadFileTool::new(SafeFs::new(dir.path()), 4);
        let err = read.execute(serde_json::json!({"filePath": "big.txt"})).await.unwrap_err();
        assert!(err.contains("File too large"));
        let err = read.execute(serde_json::json!({"filePath": "nope.txt"})).await.unwrap_err();
        assert_eq!(err, "Path not found: nope.txt");
        let err = read.execute(serde_json::json!({})).await.unwrap_err();
        assert_eq!(err, "Missing required parameter: filePath");
    }

    #[tokio::test]
    async fn test_list_dir_marks_kinds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        let tool = ListDirTool::new(SafeFs::new(dir.path()));
        let out = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(out, "Cargo.toml (file)\nsrc (dir)");
    }
}
