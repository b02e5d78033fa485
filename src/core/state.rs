//! 状态定义：UI 投影
//!
//! UI 只持有轻量的 UiState（阶段、历史尾部、控制台状态、锁、错误）；
//! 完整状态由会话任务维护并经 watch 通道投影给 UI。

use serde::Serialize;

use crate::shell::Turn;

/// 一轮对话所处阶段（UI 投影用）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TurnPhase {
    Idle,
    /// 正在拼上下文并等待推理服务回复（含投递，整轮对 UI 不可分）
    Thinking,
    Error,
}

/// 控制台引擎状态（对应状态栏文本）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ConsoleStatus {
    /// 引擎已启动，等待交互提示符
    Booting,
    /// 已检测到提示符，可投递命令
    Ready,
    /// 启动支持缺失，本会话不再重试
    Unavailable(String),
    /// 会话结束，引擎已销毁
    Stopped,
}

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub phase: TurnPhase,
    /// 历史尾部（展示上限由 shell.display_turns 决定）
    pub history: Vec<Turn>,
    pub console: ConsoleStatus,
    pub input_locked: bool,
    pub error_message: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            phase: TurnPhase::Idle,
            history: Vec::new(),
            console: ConsoleStatus::Booting,
            input_locked: false,
            error_message: None,
        }
    }
}
