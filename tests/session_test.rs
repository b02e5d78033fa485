//! 会话集成测试：脚本化控制台 + Mock 推理服务走完整装配路径

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use enigma_shell::config::AppConfig;
use enigma_shell::console::ScriptedConsole;
use enigma_shell::core::{create_session_with, ConsoleStatus, SessionCommand, UiState};
use enigma_shell::llm::{LlmClient, MockLlmClient};
use enigma_shell::shell::TurnRole;

/// 轮询状态直到谓词满足，超时视为测试失败
async fn wait_until<F>(rx: &mut watch::Receiver<UiState>, pred: F)
where
    F: Fn(&UiState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                if pred(&rx.borrow()) {
                    return;
                }
            }
            if rx.changed().await.is_err() {
                panic!("state channel closed before condition was met");
            }
        }
    })
    .await
    .expect("condition not reached within 5s");
}

#[tokio::test]
async fn test_login_bootstrap_end_to_end() {
    // 引擎输出登录提示 → 就绪 → 自举登录轮 → "root\n" 注入控制台
    let engine = ScriptedConsole::new(b"Welcome\r\nlocalhost login: ");
    let sent = engine.sent_handle();
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::with_responses([
        r#"{"type": "execute_in_enigma_os", "command": "root"}"#,
    ]));

    let (_cmd_tx, mut state_rx) =
        create_session_with(AppConfig::default(), Box::new(engine), llm)
            .await
            .unwrap();

    wait_until(&mut state_rx, |s| {
        s.console == ConsoleStatus::Ready && s.history.iter().any(|t| t.role == TurnRole::Response)
    })
    .await;

    assert_eq!(sent.lock().unwrap().as_slice(), &["root\n".to_string()]);

    let state = state_rx.borrow().clone();
    assert!(state
        .history
        .iter()
        .any(|t| t.role == TurnRole::System && t.text.contains("login prompt")));
    assert!(state
        .history
        .iter()
        .any(|t| t.role == TurnRole::Response && t.text.contains("root")));
}

#[tokio::test]
async fn test_session_survives_unavailable_engine() {
    // 引擎启动支持缺失：致命且不重试，但操作者仍能与 LLM 对话
    let engine = ScriptedConsole::unavailable();
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new());

    let (cmd_tx, mut state_rx) =
        create_session_with(AppConfig::default(), Box::new(engine), llm)
            .await
            .unwrap();

    wait_until(&mut state_rx, |s| {
        matches!(s.console, ConsoleStatus::Unavailable(_))
    })
    .await;

    cmd_tx
        .send(SessionCommand::Submit("hello there".to_string()))
        .unwrap();

    wait_until(&mut state_rx, |s| {
        s.history
            .iter()
            .any(|t| t.role == TurnRole::Response && t.text.contains("hello there"))
    })
    .await;
}

#[tokio::test]
async fn test_command_before_readiness_is_visibly_refused() {
    // 控制台永远不出现提示符：命令产生了但未投递，失败对操作者可见
    let engine = ScriptedConsole::new(b"still booting...\n");
    let sent = engine.sent_handle();
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::with_responses([
        r#"{"type": "execute_in_enigma_os", "command": "ls"}"#,
    ]));

    let (cmd_tx, mut state_rx) =
        create_session_with(AppConfig::default(), Box::new(engine), llm)
            .await
            .unwrap();

    cmd_tx
        .send(SessionCommand::Submit("list files".to_string()))
        .unwrap();

    wait_until(&mut state_rx, |s| {
        s.history
            .iter()
            .any(|t| t.role == TurnRole::Response && t.text.contains("could not be routed"))
    })
    .await;

    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_turns_are_serialized_one_request_in_flight() {
    // 两条输入接连提交：按轮串行消费，推理服务并发恒为 1
    let engine = ScriptedConsole::new(b"");
    let llm = Arc::new(
        MockLlmClient::with_responses(["one", "two"]).with_delays(vec![
            Duration::from_millis(50),
            Duration::from_millis(50),
        ]),
    );

    let (cmd_tx, mut state_rx) = create_session_with(
        AppConfig::default(),
        Box::new(engine),
        llm.clone() as Arc<dyn LlmClient>,
    )
    .await
    .unwrap();

    cmd_tx
        .send(SessionCommand::Submit("first".to_string()))
        .unwrap();
    cmd_tx
        .send(SessionCommand::Submit("second".to_string()))
        .unwrap();

    wait_until(&mut state_rx, |s| {
        s.history
            .iter()
            .filter(|t| t.role == TurnRole::Response)
            .count()
            >= 2
    })
    .await;

    assert_eq!(llm.max_in_flight(), 1);
}

#[tokio::test]
async fn test_quit_stops_engine() {
    let engine = ScriptedConsole::new(b"");
    let sent = engine.sent_handle();
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new());

    let (cmd_tx, mut state_rx) =
        create_session_with(AppConfig::default(), Box::new(engine), llm)
            .await
            .unwrap();

    cmd_tx.send(SessionCommand::Quit).unwrap();

    wait_until(&mut state_rx, |s| s.console == ConsoleStatus::Stopped).await;
    assert!(sent.lock().unwrap().is_empty());
}
