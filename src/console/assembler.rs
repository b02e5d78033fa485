//! 行装配与就绪检测
//!
//! 消费引擎的逐字节输出：丢弃 CR（CRLF 归一为 LF），LF 冲刷行缓冲为完整行；
//! 每个字节之后，若尚未就绪，则对当前（可能不完整的）行缓冲做小写、去空白后的
//! 标记子串匹配。命中时强制冲刷当前缓冲（提示符往往不带换行，等换行会死锁检测）
//! 并一次性锁存就绪标志。强制冲刷不清空缓冲，后续换行可能重复该行，属预期行为。

/// 单字节处理结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ByteOutcome {
    /// 换行触发的完整行（含结尾 `\n`）
    pub line: Option<String>,
    /// 标记命中触发的强制冲刷（含补上的 `\n`）
    pub forced: Option<String>,
    /// 本字节首次触发就绪（整个生命周期内至多一次）
    pub ready_fired: bool,
}

/// 行装配器：纯状态机，不做任何 I/O，便于用合成字节流测试
#[derive(Debug)]
pub struct LineAssembler {
    acc: String,
    /// 提示标记（存小写形式）
    marker: String,
    ready: bool,
}

impl LineAssembler {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            acc: String::new(),
            marker: marker.into().to_lowercase(),
            ready: false,
        }
    }

    /// 就绪标志：单调，false -> true 恰好一次，之后不再回退
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn push_byte(&mut self, byte: u8) -> ByteOutcome {
        let mut out = ByteOutcome::default();

        match byte {
            b'\r' => {}
            b'\n' => {
                out.line = Some(format!("{}\n", self.acc));
                self.acc.clear();
            }
            _ => self.acc.push(byte as char),
        }

        if !self.ready {
            let normalized = self.acc.trim().to_lowercase();
            if !self.marker.is_empty() && normalized.contains(&self.marker) {
                out.forced = Some(format!("{}\n", self.acc));
                self.ready = true;
                out.ready_fired = true;
            }
        }

        out
    }

    /// 依次喂入一串字节，汇总所有结果（测试与监视任务的便捷入口）
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<ByteOutcome> {
        bytes.iter().map(|&b| self.push_byte(b)).collect()
    }
}
