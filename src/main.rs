//! Enigma Shell - LLM 驱动的 enigma-os 串口控制台桥接
//!
//! 入口：初始化日志、创建会话运行时与 TUI，并运行主循环。

use anyhow::Context;
use enigma_shell::{core::create_session, observability, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    // 创建会话：返回命令发送端与状态接收端
    let (cmd_tx, state_rx) = create_session(None)
        .await
        .context("Failed to create session")?;

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送操作者输入）
    run_app(state_rx, cmd_tx).await.context("App run failed")?;

    Ok(())
}
