//! 会话装配：主控循环
//!
//! 负责：加载配置、创建引擎/LLM/编排器、建立 cmd/state/ready 通道，
//! 启动监视任务（字节 → 行装配 → 誊录/就绪）与会话任务（串行消费输入、
//! 就绪首触发时做登录自举）。会话状态仅存内存，进程退出即丢弃。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config::{load_config, AppConfig, LlmSection};
use crate::console::{ConsoleEngine, LineAssembler, ProcessConsole, TranscriptBuffer};
use crate::core::{ConsoleStatus, TurnPhase, UiState};
use crate::llm::{create_local_client, LlmClient, MockLlmClient};
use crate::shell::{ShellOrchestrator, TurnOutcome};

/// 从 UI 发往会话任务的命令
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// 提交一条操作者输入，触发一轮
    Submit(String),
    /// 结束会话，销毁引擎
    Quit,
}

/// 根据配置选择推理后端（local = OpenAI 兼容端点 / mock）
pub(crate) fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    match cfg.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::warn!("Using mock LLM, no reasoning endpoint will be contacted");
            Arc::new(MockLlmClient::new())
        }
        _ => {
            tracing::info!(base_url = %cfg.base_url, model = %cfg.model, "Using local LLM endpoint");
            Arc::new(create_local_client(cfg))
        }
    }
}

/// 创建会话运行时：返回命令发送端与状态接收端
pub async fn create_session(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(mpsc::UnboundedSender<SessionCommand>, watch::Receiver<UiState>)> {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let llm = create_llm_from_config(&cfg.llm);
    let engine = Box::new(ProcessConsole::new(cfg.console.clone()));
    create_session_with(cfg, engine, llm).await
}

/// 依赖注入变体：测试用脚本化引擎与 mock LLM 走同一条装配路径
pub async fn create_session_with(
    cfg: AppConfig,
    mut engine: Box<dyn ConsoleEngine>,
    llm: Arc<dyn LlmClient>,
) -> anyhow::Result<(mpsc::UnboundedSender<SessionCommand>, watch::Receiver<UiState>)> {
    let transcript = TranscriptBuffer::new();
    let (ready_tx, mut ready_rx) = watch::channel(false);
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<SessionCommand>();
    let (state_tx, state_rx) = watch::channel(UiState::default());

    // 引擎启动：支持缺失是本会话的致命条件，经誊录报告一次，不重试；
    // 会话本身继续存活（操作者仍可与 LLM 对话）
    let mut console_status = match engine.start().await {
        Ok(byte_rx) => {
            spawn_monitor(byte_rx, &cfg, transcript.clone(), ready_tx);
            ConsoleStatus::Booting
        }
        Err(e) => {
            tracing::error!(error = %e, "console engine unavailable");
            transcript.append(&format!("{}\n", e));
            drop(ready_tx);
            ConsoleStatus::Unavailable(e.to_string())
        }
    };

    let mut orch = ShellOrchestrator::new(llm, &cfg);
    let display_turns = cfg.shell.display_turns;

    tokio::spawn(async move {
        let publish = |orch: &ShellOrchestrator,
                       phase: TurnPhase,
                       console: &ConsoleStatus,
                       locked: bool,
                       error: Option<String>| {
            let _ = state_tx.send(UiState {
                phase,
                history: orch.history().tail(display_turns).to_vec(),
                console: console.clone(),
                input_locked: locked,
                error_message: error,
            });
        };

        publish(&orch, TurnPhase::Idle, &console_status, false, None);

        // 就绪通道关闭（引擎不可用 / 监视任务退出）后停止轮询该分支
        let mut ready_closed = matches!(console_status, ConsoleStatus::Unavailable(_));

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(SessionCommand::Submit(input)) => {
                        publish(&orch, TurnPhase::Thinking, &console_status, true, None);
                        let ready = *ready_rx.borrow();
                        let outcome = orch
                            .handle_turn(&input, false, engine.as_ref(), &transcript, ready)
                            .await;
                        finish_turn(&publish, &orch, &console_status, outcome);
                    }
                    Some(SessionCommand::Quit) | None => {
                        engine.shutdown().await;
                        console_status = ConsoleStatus::Stopped;
                        publish(&orch, TurnPhase::Idle, &console_status, true, None);
                        break;
                    }
                },
                res = ready_rx.changed(), if !ready_closed => {
                    match res {
                        Ok(()) if *ready_rx.borrow() => {
                            console_status = ConsoleStatus::Ready;
                            publish(&orch, TurnPhase::Thinking, &console_status, true, None);
                            let outcome = orch
                                .bootstrap_login(engine.as_ref(), &transcript)
                                .await;
                            finish_turn(&publish, &orch, &console_status, outcome);
                            // 就绪单调，不会再有后续跳变
                            ready_closed = true;
                        }
                        Ok(()) => {}
                        Err(_) => ready_closed = true,
                    }
                },
            }
        }
    });

    Ok((cmd_tx, state_rx))
}

/// 监视任务：逐字节装配，按到达顺序处理，完整行与强制冲刷写入誊录，就绪锁存后广播
fn spawn_monitor(
    mut byte_rx: mpsc::UnboundedReceiver<u8>,
    cfg: &AppConfig,
    transcript: TranscriptBuffer,
    ready_tx: watch::Sender<bool>,
) {
    let mut assembler = LineAssembler::new(&cfg.console.prompt_marker);
    tokio::spawn(async move {
        while let Some(byte) = byte_rx.recv().await {
            let out = assembler.push_byte(byte);
            if let Some(line) = out.line {
                transcript.append(&line);
            }
            if let Some(forced) = out.forced {
                transcript.append(&forced);
            }
            if out.ready_fired {
                tracing::info!("console prompt detected, readiness latched");
                let _ = ready_tx.send(true);
            }
        }
        tracing::debug!("console byte stream ended");
    });
}

fn finish_turn(
    publish: &impl Fn(&ShellOrchestrator, TurnPhase, &ConsoleStatus, bool, Option<String>),
    orch: &ShellOrchestrator,
    console_status: &ConsoleStatus,
    outcome: TurnOutcome,
) {
    match outcome {
        TurnOutcome::Failed(msg) => {
            publish(orch, TurnPhase::Error, console_status, false, Some(msg));
        }
        _ => {
            publish(orch, TurnPhase::Idle, console_status, false, None);
        }
    }
}
