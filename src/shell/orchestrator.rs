//! 会话编排：单轮状态机
//!
//! 一轮：拼上下文 → 单次在途请求（带超时）→ 解析动作 → 路由命令或展示文本。
//! handle_turn 要求 `&mut self`，借用检查天然排除并发在途请求；
//! 所有失败都转为历史条目，任何一次失败都不终止会话。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::console::{CommandGateway, ConsoleEngine, TranscriptBuffer};
use crate::llm::LlmClient;
use crate::shell::{parse_action, Action, ContextBuilder, Turn, TurnHistory, ROUTED_PREFIX};

/// 单轮结束时的去向（UI 据此投影阶段与错误信息）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 命令已交给网关（投递成功）
    Routed,
    /// 自然语言已入历史待展示
    Displayed,
    /// 超时 / 传输失败 / 投递被拒，细节已写入历史
    Failed(String),
    /// 空输入，无事发生
    Skipped,
}

/// 编排器：持有推理客户端、网关、上下文构建器与历史
pub struct ShellOrchestrator {
    llm: Arc<dyn LlmClient>,
    gateway: CommandGateway,
    context: ContextBuilder,
    history: TurnHistory,
    request_timeout: Duration,
    login_account: String,
    /// 登录自举只发一次（就绪相邻输出重复出现也不会再触发）
    bootstrap_done: bool,
}

impl ShellOrchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, cfg: &AppConfig) -> Self {
        Self {
            llm,
            gateway: CommandGateway::new(),
            context: ContextBuilder::new(
                &cfg.console.prompt_marker,
                &cfg.console.login_account,
                cfg.shell.transcript_tail_chars,
                cfg.shell.context_turns,
            ),
            history: TurnHistory::new(cfg.shell.max_history_turns),
            request_timeout: Duration::from_secs(cfg.llm.request_timeout_secs),
            login_account: cfg.console.login_account.clone(),
            bootstrap_done: false,
        }
    }

    pub fn history(&self) -> &TurnHistory {
        &self.history
    }

    /// 就绪信号首次触发时的自举：合成一条系统通告与一条系统触发输入，
    /// 走与操作者输入完全相同的状态机。幂等。
    pub async fn bootstrap_login(
        &mut self,
        engine: &dyn ConsoleEngine,
        transcript: &TranscriptBuffer,
    ) -> TurnOutcome {
        if self.bootstrap_done {
            return TurnOutcome::Skipped;
        }
        self.bootstrap_done = true;

        self.history.push(Turn::system(
            "SYSTEM_OBSERVATION: enigma-os is at the login prompt; initiating login.",
        ));
        let instruction = format!(
            "enigma-os is showing a login prompt. Proceed to log in as '{}'.",
            self.login_account
        );
        self.handle_turn(&instruction, true, engine, transcript, true)
            .await
    }

    /// 执行一轮：`system_triggered` 的输入不作为操作者命令入历史。
    /// `ready` 为当前就绪标志，决定命令能否路由。
    pub async fn handle_turn(
        &mut self,
        input: &str,
        system_triggered: bool,
        engine: &dyn ConsoleEngine,
        transcript: &TranscriptBuffer,
        ready: bool,
    ) -> TurnOutcome {
        let input = input.trim();
        if input.is_empty() {
            return TurnOutcome::Skipped;
        }

        // 上下文先于本轮输入构建：输入单独作为最后一条 user 消息
        let messages = self.context.build(transcript, &self.history, input);
        if !system_triggered {
            self.history.push(Turn::command(input));
        }

        let raw = match tokio::time::timeout(self.request_timeout, self.llm.complete(&messages))
            .await
        {
            Err(_) => {
                let text = format!(
                    "LLM error: request exceeded the {}s timeout",
                    self.request_timeout.as_secs()
                );
                tracing::warn!(timeout_secs = self.request_timeout.as_secs(), "llm request timed out");
                self.history.push(Turn::error(&text));
                return TurnOutcome::Failed(text);
            }
            Ok(Err(e)) => {
                let text = format!("LLM error: {}", e);
                tracing::warn!(error = %e, "llm request failed");
                self.history.push(Turn::error(&text));
                return TurnOutcome::Failed(text);
            }
            Ok(Ok(raw)) => raw,
        };

        tracing::debug!(usage = ?self.llm.token_usage(), "llm call complete");

        match parse_action(&raw) {
            Action::RunCommand(command) => {
                self.gateway.submit(command.as_str());
                match self.gateway.deliver(engine, ready).await {
                    Ok(_) => {
                        self.history
                            .push(Turn::response(format!("{}{}", ROUTED_PREFIX, command)));
                        TurnOutcome::Routed
                    }
                    Err(e) => {
                        // 命令产生了但没送到：对操作者可见，绝不静默丢弃
                        let text = format!(
                            "command \"{}\" could not be routed to enigma-os: {}",
                            command, e
                        );
                        self.history.push(Turn::response(&text));
                        TurnOutcome::Failed(text)
                    }
                }
            }
            Action::NaturalLanguage(text) => {
                self.history.push(Turn::response(text));
                TurnOutcome::Displayed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::console::ScriptedConsole;
    use crate::llm::MockLlmClient;

    fn cfg() -> AppConfig {
        AppConfig::default()
    }

    async fn started_engine() -> ScriptedConsole {
        let mut engine = ScriptedConsole::new(b"");
        let _rx = engine.start().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_structured_action_routed_when_ready() {
        let engine = started_engine().await;
        let sent = engine.sent_handle();
        let llm = Arc::new(MockLlmClient::with_responses([
            r#"{"type": "execute_in_enigma_os", "command": "ls -la"}"#,
        ]));
        let mut orch = ShellOrchestrator::new(llm, &cfg());
        let transcript = TranscriptBuffer::new();

        let outcome = orch
            .handle_turn("list files", false, &engine, &transcript, true)
            .await;
        assert_eq!(outcome, TurnOutcome::Routed);
        assert_eq!(sent.lock().unwrap().as_slice(), &["ls -la\n".to_string()]);

        let turns = orch.history().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, format!("{}ls -la", ROUTED_PREFIX));
    }

    #[tokio::test]
    async fn test_command_while_not_ready_yields_visible_failure() {
        let engine = started_engine().await;
        let sent = engine.sent_handle();
        let llm = Arc::new(MockLlmClient::with_responses([
            r#"{"type": "execute_in_enigma_os", "command": "root"}"#,
        ]));
        let mut orch = ShellOrchestrator::new(llm, &cfg());
        let transcript = TranscriptBuffer::new();

        let outcome = orch
            .handle_turn("log in", false, &engine, &transcript, false)
            .await;
        assert!(matches!(outcome, TurnOutcome::Failed(_)));
        assert!(sent.lock().unwrap().is_empty());

        let last = orch.history().turns().last().unwrap();
        assert!(last.text.contains("root"));
        assert!(last.text.contains("could not be routed"));
    }

    #[tokio::test]
    async fn test_plain_prose_becomes_verbatim_response_turn() {
        let engine = started_engine().await;
        let prose = "enigma-os is still booting, nothing to do yet.";
        let llm = Arc::new(MockLlmClient::with_responses([prose]));
        let mut orch = ShellOrchestrator::new(llm, &cfg());
        let transcript = TranscriptBuffer::new();

        let outcome = orch
            .handle_turn("status?", false, &engine, &transcript, true)
            .await;
        assert_eq!(outcome, TurnOutcome::Displayed);
        assert_eq!(orch.history().turns().last().unwrap().text, prose);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_one_error_turn_and_loop_stays_usable() {
        let engine = started_engine().await;
        let llm = Arc::new(
            MockLlmClient::with_responses(["all good"])
                .with_delays(vec![Duration::from_secs(120)]),
        );
        let mut orch = ShellOrchestrator::new(llm, &cfg());
        let transcript = TranscriptBuffer::new();

        let outcome = orch
            .handle_turn("first", false, &engine, &transcript, true)
            .await;
        assert!(matches!(outcome, TurnOutcome::Failed(_)));

        let errors: Vec<_> = orch
            .history()
            .turns()
            .iter()
            .filter(|t| t.role == crate::shell::TurnRole::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("timeout"));

        // 超时后循环仍可用：下一轮正常完成
        let outcome = orch
            .handle_turn("second", false, &engine, &transcript, true)
            .await;
        assert_eq!(outcome, TurnOutcome::Displayed);
        assert_eq!(orch.history().turns().last().unwrap().text, "all good");
    }

    #[tokio::test]
    async fn test_bootstrap_fires_exactly_once() {
        let engine = started_engine().await;
        let sent = engine.sent_handle();
        let llm = Arc::new(MockLlmClient::with_responses([
            r#"{"type": "execute_in_enigma_os", "command": "root"}"#,
            r#"{"type": "execute_in_enigma_os", "command": "root"}"#,
        ]));
        let mut orch = ShellOrchestrator::new(llm, &cfg());
        let transcript = TranscriptBuffer::new();
        transcript.append("localhost login:\n");

        let first = orch.bootstrap_login(&engine, &transcript).await;
        assert_eq!(first, TurnOutcome::Routed);
        let second = orch.bootstrap_login(&engine, &transcript).await;
        assert_eq!(second, TurnOutcome::Skipped);

        assert_eq!(sent.lock().unwrap().as_slice(), &["root\n".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_input_is_skipped() {
        let engine = started_engine().await;
        let llm = Arc::new(MockLlmClient::new());
        let mut orch = ShellOrchestrator::new(llm, &cfg());
        let transcript = TranscriptBuffer::new();

        let outcome = orch
            .handle_turn("   ", false, &engine, &transcript, true)
            .await;
        assert_eq!(outcome, TurnOutcome::Skipped);
        assert!(orch.history().turns().is_empty());
    }
}
