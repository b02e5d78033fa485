//! 控制台引擎抽象与子进程实现
//!
//! 引擎对本系统是黑盒：逐字节输出、按键注入、存活判断、启停。
//! ProcessConsole 以子进程方式启动模拟机（默认 QEMU，`-nographic` 把串口挂到 stdio），
//! 逐字节转发 stdout、向 stdin 写入注入文本。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, Mutex};

use crate::config::ConsoleSection;
use crate::core::BridgeError;

/// 控制台引擎接口：会话内单例，创建一次、销毁一次
#[async_trait]
pub trait ConsoleEngine: Send + Sync {
    /// 启动引擎，返回串口字节输出的接收端；启动支持缺失时返回
    /// `EngineUnavailable`，该会话不再重试
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<u8>, BridgeError>;

    /// 存活判断
    fn is_running(&self) -> bool;

    /// 按键注入：原样发送，不做转义
    async fn send_input(&self, text: &str) -> Result<(), BridgeError>;

    /// 幂等销毁，错误一律吞掉
    async fn shutdown(&mut self);
}

/// 子进程实现：spawn 配置里的模拟机命令，stdout 为串口输出，stdin 为按键注入
pub struct ProcessConsole {
    cfg: ConsoleSection,
    child: Option<Child>,
    stdin: Option<Arc<Mutex<ChildStdin>>>,
    running: Arc<AtomicBool>,
}

impl ProcessConsole {
    pub fn new(cfg: ConsoleSection) -> Self {
        Self {
            cfg,
            child: None,
            stdin: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl ConsoleEngine for ProcessConsole {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<u8>, BridgeError> {
        let mut child = tokio::process::Command::new(&self.cfg.command)
            .args(&self.cfg.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::EngineUnavailable(format!(
                    "failed to launch '{}': {}",
                    self.cfg.command, e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::EngineUnavailable("engine stdin not piped".into()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::EngineUnavailable("engine stdout not piped".into()))?;

        self.running.store(true, Ordering::SeqCst);
        tracing::info!(command = %self.cfg.command, "console engine launched");

        // 静置等待串口挂载，再开始消费输出
        tokio::time::sleep(std::time::Duration::from_millis(self.cfg.settle_delay_ms)).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let running = self.running.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        // 逐字节下发，保持到达顺序
                        for &b in &buf[..n] {
                            if tx.send(b).is_err() {
                                running.store(false, Ordering::SeqCst);
                                return;
                            }
                        }
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
            tracing::info!("console engine output stream closed");
        });

        self.child = Some(child);
        self.stdin = Some(Arc::new(Mutex::new(stdin)));
        Ok(rx)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn send_input(&self, text: &str) -> Result<(), BridgeError> {
        let stdin = self
            .stdin
            .as_ref()
            .ok_or(BridgeError::InputChannelClosed)?;
        let mut guard = stdin.lock().await;
        guard
            .write_all(text.as_bytes())
            .await
            .map_err(|_| BridgeError::InputChannelClosed)?;
        guard
            .flush()
            .await
            .map_err(|_| BridgeError::InputChannelClosed)?;
        Ok(())
    }

    async fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "console engine kill failed");
            }
        }
        self.stdin = None;
        self.running.store(false, Ordering::SeqCst);
    }
}
