//! 上下文构建：系统前导 + 控制台快照尾部 + 历史尾部 + 新输入
//!
//! 固定拼接顺序；推理服务上下文窗口有限，按「最近优先」截断：
//! 控制台快照取末尾 N 字符，历史取末尾 N 轮。

use crate::console::TranscriptBuffer;
use crate::llm::Message;
use crate::shell::{TurnHistory, TurnRole};

/// 上下文构建器：持有截断边界与前导参数（标记、登录账户）
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    prompt_marker: String,
    login_account: String,
    transcript_tail_chars: usize,
    context_turns: usize,
}

impl ContextBuilder {
    pub fn new(
        prompt_marker: impl Into<String>,
        login_account: impl Into<String>,
        transcript_tail_chars: usize,
        context_turns: usize,
    ) -> Self {
        Self {
            prompt_marker: prompt_marker.into(),
            login_account: login_account.into(),
            transcript_tail_chars,
            context_turns,
        }
    }

    /// 静态前导：两种允许的回复形态 + 登录自举规则
    fn preamble(&self) -> String {
        format!(
            r#"You are Enigma Shell AI. You operate "enigma-os", an Alpine Linux environment reachable only through its serial console.
IMPORTANT: if the enigma-os output I give you contains "{marker}", your VERY FIRST action MUST be to log in. To do so, reply ONLY with the JSON object:
{{"type": "{tag}", "command": "{account}"}}
No password is required for "{account}" by default on this image. After sending "{account}", wait for the next OS output to see the shell prompt (for example "localhost:~#").

For ALL other commands to run inside enigma-os (AFTER a successful login), reply ONLY with a JSON object of the form:
{{"type": "{tag}", "command": "your linux command here"}}
Example: {{"type": "{tag}", "command": "ls -la"}}

If the request requires no action inside enigma-os, or you are interpreting enigma-os output for the user, answer in natural language.
Be concise. The current time is {now}."#,
            marker = self.prompt_marker,
            tag = crate::shell::EXECUTE_TAG,
            account = self.login_account,
            now = chrono::Utc::now().to_rfc3339(),
        )
    }

    /// 组装完整消息列表：system（前导 + 快照）→ 历史（Command→user，Response→assistant，
    /// 跳过系统/错误通告与路由回显）→ 新输入作为最后一条 user
    pub fn build(
        &self,
        transcript: &TranscriptBuffer,
        history: &TurnHistory,
        input: &str,
    ) -> Vec<Message> {
        let snapshot = transcript.tail(self.transcript_tail_chars);
        let system = format!(
            "{}\nLATEST ENIGMA-OS OUTPUT SNAPSHOT (use as context):\n---\n{}\n---",
            self.preamble(),
            snapshot
        );

        let mut messages = vec![Message::system(system)];

        let eligible: Vec<_> = history
            .turns()
            .iter()
            .filter(|t| {
                matches!(t.role, TurnRole::Command | TurnRole::Response) && !t.is_routed_echo()
            })
            .collect();
        let start = eligible.len().saturating_sub(self.context_turns);
        for turn in &eligible[start..] {
            let msg = match turn.role {
                TurnRole::Command => Message::user(turn.text.clone()),
                _ => Message::assistant(turn.text.clone()),
            };
            messages.push(msg);
        }

        messages.push(Message::user(input));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use crate::shell::{Turn, ROUTED_PREFIX};

    fn builder() -> ContextBuilder {
        ContextBuilder::new("login:", "root", 2000, 6)
    }

    #[test]
    fn test_message_order_and_roles() {
        let transcript = TranscriptBuffer::new();
        transcript.append("localhost login:\n");
        let mut history = TurnHistory::new(50);
        history.push(Turn::command("what do you see?"));
        history.push(Turn::response("a login prompt"));

        let messages = builder().build(&transcript, &history, "log in please");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "what do you see?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "log in please");
    }

    #[test]
    fn test_system_message_carries_preamble_and_snapshot() {
        let transcript = TranscriptBuffer::new();
        transcript.append("Welcome\nlocalhost login:\n");
        let history = TurnHistory::new(50);

        let messages = builder().build(&transcript, &history, "hi");
        let system = &messages[0].content;
        assert!(system.contains("execute_in_enigma_os"));
        assert!(system.contains("login:"));
        assert!(system.contains("root"));
        assert!(system.contains("localhost login:"));
    }

    #[test]
    fn test_snapshot_is_bounded_tail() {
        let transcript = TranscriptBuffer::new();
        transcript.append(&"x".repeat(5000));
        transcript.append("THE-END");
        let history = TurnHistory::new(50);

        let cb = ContextBuilder::new("login:", "root", 10, 6);
        let messages = cb.build(&transcript, &history, "hi");
        assert!(messages[0].content.contains("xxxTHE-END"));
        assert!(!messages[0].content.contains("xxxxxxxxxxxxTHE-END"));
    }

    #[test]
    fn test_history_tail_excludes_notices_and_routed_echoes() {
        let transcript = TranscriptBuffer::new();
        let mut history = TurnHistory::new(50);
        history.push(Turn::system("SYSTEM_OBSERVATION: ..."));
        history.push(Turn::error("LLM error: timeout"));
        history.push(Turn::command("run ls"));
        history.push(Turn::response(format!("{}ls -la", ROUTED_PREFIX)));
        history.push(Turn::response("here is what I found"));

        let messages = builder().build(&transcript, &history, "next");
        // system + (command, response) + 新输入
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "run ls");
        assert_eq!(messages[2].content, "here is what I found");
    }

    #[test]
    fn test_history_tail_is_bounded() {
        let transcript = TranscriptBuffer::new();
        let mut history = TurnHistory::new(50);
        for i in 0..10 {
            history.push(Turn::command(format!("c{}", i)));
        }

        let cb = ContextBuilder::new("login:", "root", 2000, 3);
        let messages = cb.build(&transcript, &history, "next");
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[1].content, "c7");
        assert_eq!(messages[3].content, "c9");
    }
}
