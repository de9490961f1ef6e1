//! 工具箱：Tool trait、注册表与沙箱化的具体工具

pub mod context;
pub mod filesystem;
pub mod list_recursive;
pub mod patch;
pub mod registry;
pub mod search;
pub mod shell;

use std::path::Path;

pub use context::WorkspaceContextTool;
pub use filesystem::{ListDirTool, ReadFileTool, SafeFs, WriteFileTool};
pub use list_recursive::ListFilesRecursiveTool;
pub use patch::ApplyDiffTool;
pub use registry::{Tool, ToolRegistry};
pub use search::SearchFilesTool;
pub use shell::RunCommandTool;

use crate::config::ToolsSection;

/// 默认工具集，全部绑定到同一个工作区根目录
pub fn default_registry(workspace_root: &Path, settings: &ToolsSection) -> ToolRegistry {
    let fs = SafeFs::new(workspace_root);
    let mut registry = ToolRegistry::new().with_timeout(settings.tool_timeout_secs);
    registry.register(ReadFileTool::new(fs.clone(), settings.max_read_bytes));
    registry.register(WriteFileTool::new(fs.clone()));
    registry.register(ListDirTool::new(fs.clone()));
    registry.register(ListFilesRecursiveTool::new(fs.clone()));
    registry.register(SearchFilesTool::new(fs.clone()));
    registry.register(ApplyDiffTool::new(fs.clone()));
    // 命令自带超时，注册表的期限略长于它，保证先报出命令自己的超时
    registry.register_with_timeout(
        RunCommandTool::new(fs.root(), settings.command_timeout_secs),
        settings.command_timeout_secs + 1,
    );
    registry.register(WorkspaceContextTool::new(fs));
    registry
}
