//! Aion 终端驱动
//!
//! 入口：初始化日志（stderr）、按配置创建编排器，从 stdin 逐行读取指令，事件打印到 stdout。
//! 用法：`aion [config.toml]`；`/mode <name>`、`/reset`、`/quit`，有待审批请求时输入 y / n。

use std::path::PathBuf;
use std::sync::Arc;

use aion::config::{load_config, AppConfig};
use aion::core::{create_orchestrator, Orchestrator};
use aion::memory::Role;
use aion::react::{AgentEvent, EventKind, Mode};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn print_event(ev: &AgentEvent) {
    match ev.kind {
        EventKind::Busy(true) => println!("… thinking"),
        EventKind::Busy(false) => {}
        EventKind::Ended(ref outcome) => {
            let label = serde_json::to_value(outcome)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            println!("[session {} ended: {}]", ev.session, label);
        }
        EventKind::Message(ref msg) => match msg.role {
            Role::User => {}
            Role::Thought => println!("(thought) {}", msg.content),
            Role::Tool => println!("[tool result]\n{}", msg.content),
            Role::Assistant if msg.requires_approval => {
                let args = msg
                    .tool_call
                    .as_ref()
                    .map(|c| c.args.to_string())
                    .unwrap_or_default();
                println!("{}\n  args: {}\n  approve? [y/n]", msg.content, args);
            }
            Role::Assistant => println!("{}", msg.content),
        },
    }
}

/// 返回 false 表示退出
fn handle_line(orchestrator: &Arc<Orchestrator>, mode: &mut Mode, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }

    if orchestrator.pending_approval().is_some() {
        match line.to_ascii_lowercase().as_str() {
            "y" | "yes" => {
                orchestrator.resolve_approval(true);
                return true;
            }
            "n" | "no" => {
                orchestrator.resolve_approval(false);
                return true;
            }
            _ => {}
        }
    }

    if let Some(cmd) = line.strip_prefix('/') {
        let (name, arg) = cmd.split_once(' ').unwrap_or((cmd, ""));
        match name {
            "quit" | "exit" => return false,
            "reset" => {
                orchestrator.reset();
                println!("[session reset]");
            }
            "mode" if !arg.trim().is_empty() => {
                *mode = Mode::from(arg);
                println!("[mode: {}]", mode);
            }
            "mode" => println!("[mode: {}]", mode),
            _ => println!("Commands: /mode <Architect|Code|Ask|Debug>, /reset, /quit"),
        }
        return true;
    }

    if orchestrator.is_running() {
        println!("[busy: a task is already running]");
        return true;
    }
    let orchestrator = Arc::clone(orchestrator);
    let mode = mode.clone();
    let text = line.to_string();
    tokio::spawn(async move {
        orchestrator.run_session(&text, &mode).await;
    });
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志写 stderr，默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let (orchestrator, mut events) = create_orchestrator(&cfg, config_path);
    let orchestrator = Arc::new(orchestrator);

    let printer = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            while let Some(ev) = events.recv().await {
                // 已 reset 的旧会话事件不再展示
                if ev.session == orchestrator.session_id() {
                    print_event(&ev);
                }
            }
        })
    };

    println!("Aion ready. Type a task, or /mode, /reset, /quit.");
    let mut mode = Mode::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if !handle_line(&orchestrator, &mut mode, &line) {
            break;
        }
    }

    printer.abort();
    Ok(())
}
