//! 命令网关：单槽待投递命令
//!
//! submit 存入待投递命令（覆盖未消费的旧值，后写者胜，打 warn）；
//! deliver 先清槽再检查前置条件（就绪、存活），补一个结尾换行后注入，
//! 发射后不管：不等待也不解释控制台的执行结果。网关自身不重试、不退避，
//! 是否重试由提交方决定。

use std::sync::Mutex;

use crate::console::ConsoleEngine;
use crate::core::BridgeError;

/// 单槽邮箱，不是队列。编排器按轮串行化，按约定只有一个生产者。
#[derive(Debug, Default)]
pub struct CommandGateway {
    pending: Mutex<Option<String>>,
}

impl CommandGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 存入待投递命令；未消费的旧值被覆盖（后写者胜）
    pub fn submit(&self, command: impl Into<String>) {
        let command = command.into();
        let mut slot = self.pending.lock().unwrap();
        if let Some(old) = slot.replace(command) {
            tracing::warn!(dropped = %old, "pending command overwritten, last writer wins");
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().unwrap().is_some()
    }

    /// 尝试投递：一次尝试后槽位必定清空（成败皆然）。
    /// 前置条件依次为：就绪标志已触发、引擎存活；注入失败视为输入通道不可用。
    /// 槽位为空时返回 Ok(None)；成功时返回投递的命令文本（补换行前的原文）。
    pub async fn deliver(
        &self,
        engine: &dyn ConsoleEngine,
        ready: bool,
    ) -> Result<Option<String>, BridgeError> {
        let command = self.pending.lock().unwrap().take();
        let Some(command) = command else {
            return Ok(None);
        };

        if !ready {
            tracing::warn!(command = %command, precondition = "readiness", "delivery refused");
            return Err(BridgeError::ConsoleNotReady);
        }
        if !engine.is_running() {
            tracing::warn!(command = %command, precondition = "is_running", "delivery refused");
            return Err(BridgeError::EngineNotRunning);
        }

        engine.send_input(&format!("{}\n", command)).await?;
        tracing::info!(command = %command, "command delivered to console");
        Ok(Some(command))
    }
}
