//! run_command：在工作区根目录执行 shell 命令（需审批）
//!
//! 通过 sh -c / cmd /C 执行，带超时；拒绝明显破坏性的子串（rm -rf、mkfs、fork bomb 等）。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::core::ToolError;
use crate::tools::filesystem::str_arg;
use crate::tools::Tool;

/// 即使用户批准也拒绝执行的子串
const FORBIDDEN_SUBSTR: &[&str] = &[
    "rm -rf /",
    "rm -fr /",
    "mkfs",
    "dd if=",
    "> /dev/sd",
    "chmod -r 777 /",
    ":(){ :|:& };:", // fork bomb
];

pub struct RunCommandTool {
    cwd: PathBuf,
    timeout_secs: u64,
}

impl RunCommandTool {
    pub fn new(cwd: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            cwd: cwd.into(),
            timeout_secs,
        }
    }

    fn check(command: &str) -> Result<(), ToolError> {
        if command.is_empty() {
            return Err(ToolError::InvalidArgs("Empty command".to_string()));
        }
        let lower = command.to_lowercase();
        match FORBIDDEN_SUBSTR.iter().find(|f| lower.contains(*f)) {
            Some(f) => Err(ToolError::Forbidden(f.to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace root and return its output."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "The shell command to execute." }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let command = str_arg(&args, "command")?.trim();
        Self::check(command)?;
        tracing::info!(command = %command, cwd = %self.cwd.display(), "run_command tool execute");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(&self.cwd).kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| ToolError::Timeout(self.timeout_secs))?
            .map_err(ToolError::from)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(format!(
                "Command failed with exit code {}\nStderr: {}",
                code,
                stderr.trim()
            ));
        }
        if !stdout.trim().is_empty() {
            Ok(stdout.into_owned())
        } else if !stderr.trim().is_empty() {
            Ok(stderr.into_owned())
        } else {
            Ok("Command executed successfully (no output).".to_string())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_stderr_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RunCommandTool::new(dir.path(), 10);
        let out = tool.execute(serde_json::json!({"command": "echo hi"})).await.unwrap();
        assert_eq!(out, "hi\n");
        let out = tool.execute(serde_json::json!({"command": "echo warn 1>&2"})).await.unwrap();
        assert_eq!(out, "warn\n");
        let out = tool.execute(serde_json::json!({"command": "true"})).await.unwrap();
        assert_eq!(out, "Command executed successfully (no output).");
    }

    #[tokio::test]
    async fn test_runs_in_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let tool = RunCommandTool::new(dir.path(), 10);
        let out = tool.execute(serde_json::json!({"command": "ls"})).await.unwrap();
        assert_eq!(out.trim(), "marker.txt");
    }

    #[tokio::test]
    async fn test_failure_and_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RunCommandTool::new(dir.path(), 10);
        let err = tool
            .execute(serde_json::json!({"command": "echo boom 1>&2; exit 3"}))
            .await
            .unwrap_err();
        assert_eq!(err, "Command failed with exit code 3\nStderr: boom");
        let err = tool.execute(serde_json::json!({"command": "rm -rf /"})).await.unwrap_err();
        assert_eq!(err, "Forbidden pattern: rm -rf /");
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RunCommandTool::new(dir.path(), 1);
        let err = tool.execute(serde_json::json!({"command": "sleep 5"})).await.unwrap_err();
        assert_eq!(err, "Timed out after 1s");
    }
}
