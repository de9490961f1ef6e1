//! get_context：工作区概况（根目录、平台、本地时间、顶层条目）

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::filesystem::SafeFs;
use crate::tools::Tool;

/// 顶层条目最多展示数
const MAX_TOP_LEVEL: usize = 100;

pub struct WorkspaceContextTool {
    fs: SafeFs,
}

impl WorkspaceContextTool {
    pub fn new(fs: SafeFs) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for WorkspaceContextTool {
    fn name(&self) -> &str {
        "get_context"
    }

    fn description(&self) -> &str {
        "Describe the workspace: root path, operating system, local time and top-level entries."
    }

    async fn execute(&self, _args: Value) -> Result<String, String> {
        tracing::info!("get_context tool execute");
        let mut entries = self.fs.list_dir("")?;
        let total = entries.len();
        entries.truncate(MAX_TOP_LEVEL);

        let mut out = format!(
            "Workspace root: {}\nPlatform: {} ({})\nLocal time: {}\nTop-level entries:\n",
            self.fs.root().display(),
            std::env::consts::OS,
            std::env::consts::ARCH,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S %:z"),
        );
        if entries.is_empty() {
            out.push_str("(empty)");
        } else {
            out.push_str(&entries.join("\n"));
        }
        if total > MAX_TOP_LEVEL {
            out.push_str(&format!("\n... ({} more)", total - MAX_TOP_LEVEL));
        }
        Ok(out)
    }
}
