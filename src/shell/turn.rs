//! 会话轮次与有界历史
//!
//! 一轮 = 一条不可变记录：角色（操作者命令 / 助手回复 / 系统通告 / 错误通告）、
//! 文本、时间戳。历史有保留上限，超出丢弃最旧；展示与上下文构建各自取独立的尾部。

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

/// 路由成功记录的前缀；带此前缀的回复轮不回流到推理服务的上下文
pub const ROUTED_PREFIX: &str = "-> enigma-os: ";

/// 轮次角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TurnRole {
    /// 操作者输入的命令
    Command,
    /// 助手回复（自然语言，或路由记录）
    Response,
    /// 系统通告（状态、自举观察）
    System,
    /// 错误通告（超时、传输失败）
    Error,
}

/// 单轮记录，创建后不可变
#[derive(Clone, Debug, Serialize)]
pub struct Turn {
    pub id: Uuid,
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl Turn {
    fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    pub fn command(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Command, text)
    }

    pub fn response(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Response, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(TurnRole::System, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Error, text)
    }

    /// 是否为路由成功的回显记录（UI 可见，但不作为助手话语送回推理服务）
    pub fn is_routed_echo(&self) -> bool {
        self.role == TurnRole::Response && self.text.starts_with(ROUTED_PREFIX)
    }
}

/// 有界轮次历史：保留上限内的最近轮次
#[derive(Clone, Debug)]
pub struct TurnHistory {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl TurnHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.prune();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// 最近 n 轮
    pub fn tail(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// 超出上限时丢弃最旧的轮次
    fn prune(&mut self) {
        if self.turns.len() > self.max_turns {
            let overflow = self.turns.len() - self.max_turns;
            self.turns.drain(..overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_prunes_oldest() {
        let mut history = TurnHistory::new(3);
        for i in 0..5 {
            history.push(Turn::command(format!("cmd {}", i)));
        }
        assert_eq!(history.turns().len(), 3);
        assert_eq!(history.turns()[0].text, "cmd 2");
        assert_eq!(history.turns()[2].text, "cmd 4");
    }

    #[test]
    fn test_tail_bounds() {
        let mut history = TurnHistory::new(10);
        for i in 0..4 {
            history.push(Turn::response(format!("r{}", i)));
        }
        assert_eq!(history.tail(2).len(), 2);
        assert_eq!(history.tail(2)[0].text, "r2");
        assert_eq!(history.tail(100).len(), 4);
    }

    #[test]
    fn test_routed_echo_detection() {
        assert!(Turn::response(format!("{}ls -la", ROUTED_PREFIX)).is_routed_echo());
        assert!(!Turn::response("plain reply").is_routed_echo());
        assert!(!Turn::command(format!("{}ls", ROUTED_PREFIX)).is_routed_echo());
    }
}
