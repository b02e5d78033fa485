//! 脚本化控制台（用于测试，无需真实模拟机）
//!
//! 启动时按脚本回放字节流，记录所有注入的输入；`unavailable` 构造器
//! 模拟启动支持缺失的致命路径。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::console::ConsoleEngine;
use crate::core::BridgeError;

/// 脚本化引擎：回放 script 字节，sent 记录注入历史
pub struct ScriptedConsole {
    script: Mutex<VecDeque<u8>>,
    sent: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicBool>,
    feed_tx: Mutex<Option<mpsc::UnboundedSender<u8>>>,
    fail_start: bool,
}

impl ScriptedConsole {
    pub fn new(script: &[u8]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            sent: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            feed_tx: Mutex::new(None),
            fail_start: false,
        }
    }

    /// 模拟引擎运行时支持缺失：start 必定失败
    pub fn unavailable() -> Self {
        let mut c = Self::new(b"");
        c.fail_start = true;
        c
    }

    /// 注入历史的共享句柄（引擎移交给会话任务后测试侧仍可观察）
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    /// start 之后继续追加输出字节（模拟命令执行产生的新誊录）
    pub fn feed(&self, bytes: &[u8]) {
        if let Some(tx) = self.feed_tx.lock().unwrap().as_ref() {
            for &b in bytes {
                let _ = tx.send(b);
            }
        }
    }

    /// 模拟引擎进程退出
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConsoleEngine for ScriptedConsole {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<u8>, BridgeError> {
        if self.fail_start {
            return Err(BridgeError::EngineUnavailable(
                "scripted runtime support missing".into(),
            ));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        for b in self.script.lock().unwrap().drain(..) {
            let _ = tx.send(b);
        }
        *self.feed_tx.lock().unwrap() = Some(tx);
        self.running.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn send_input(&self, text: &str) -> Result<(), BridgeError> {
        if !self.is_running() {
            return Err(BridgeError::InputChannelClosed);
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        *self.feed_tx.lock().unwrap() = None;
    }
}
