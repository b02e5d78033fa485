//! 错误类型
//!
//! 所有错误都在组件边界被捕获并转为历史条目或状态文本展示，任何单次失败都不会终止会话循环。

use thiserror::Error;

/// 桥接运行中可能出现的错误（推理服务、控制台引擎、投递前置条件等）
#[derive(Error, Debug)]
pub enum BridgeError {
    /// 推理服务请求超时；与一般传输错误区分，便于操作者判断「服务慢」还是「服务挂」
    #[error("LLM request timed out")]
    LlmTimeout,

    #[error("LLM error: {0}")]
    Llm(String),

    /// 模拟机启动支持缺失或启动失败：该会话的致命条件，报告一次，不重试
    #[error("console engine unavailable: {0}")]
    EngineUnavailable(String),

    /// 投递前置条件：引擎进程已退出
    #[error("console engine is not running")]
    EngineNotRunning,

    /// 投递前置条件：引擎输入通道不可用
    #[error("console input channel closed")]
    InputChannelClosed,

    /// 投递前置条件：尚未观测到交互提示符
    #[error("console is not ready")]
    ConsoleNotReady,

    #[error("config error: {0}")]
    Config(String),
}
