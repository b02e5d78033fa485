//! Mock 推理客户端（用于测试，无需端点）
//!
//! 按脚本依次吐出响应，耗尽后回显最后一条 user 消息；可配置逐次延迟
//! （配合 tokio 虚拟时钟测超时路径），并记录最大并发度以验证按轮串行。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：脚本响应 + 可选延迟 + 并发观测
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
    /// 每次调用弹出一个延迟，弹完则不再延迟
    delays: Mutex<VecDeque<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, delays: Vec<Duration>) -> Self {
        self.delays = Mutex::new(delays.into_iter().collect());
        self
    }

    /// 观测到的最大并发调用数；按轮串行时恒为 1
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// 调用计数守卫：Drop 时递减，调用被超时取消也能正确回收
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        // 延迟在取响应之前：被超时取消的调用不消耗脚本响应
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.lock().unwrap().pop_front();
        let reply = scripted.unwrap_or_else(|| {
            let last_user = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.as_str())
                .unwrap_or("(no input)");
            format!("Echo from Mock: {}", last_user)
        });

        Ok(reply)
    }
}
