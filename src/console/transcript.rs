//! 会话誊录：控制台输出的只追加缓冲
//!
//! 监视任务写入（完整行、强制冲刷、引擎状态文本），其余组件只读。
//! 会话期间从不截断，消费方只读有界的字符尾部。

use std::sync::{Arc, RwLock};

/// 誊录缓冲句柄：跨任务共享，追加仅限 crate 内（装配器所在的监视任务）
#[derive(Clone, Debug, Default)]
pub struct TranscriptBuffer {
    inner: Arc<RwLock<String>>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加文本（完整行或状态文本）
    pub(crate) fn append(&self, text: &str) {
        self.inner.write().unwrap().push_str(text);
    }

    /// 末尾 n 个字符（UTF-8 安全），n 为 0 时返回空串
    pub fn tail(&self, n: usize) -> String {
        let guard = self.inner.read().unwrap();
        if n == 0 {
            return String::new();
        }
        match guard.char_indices().rev().nth(n - 1) {
            Some((idx, _)) => guard[idx..].to_string(),
            None => guard.clone(),
        }
    }

    /// 完整快照（诊断用）
    pub fn snapshot(&self) -> String {
        self.inner.read().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }
}
