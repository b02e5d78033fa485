//! 动作解析：从自由文本中提取结构化指令
//!
//! 两段式流水线：先做候选提取（优先 ```json 围栏，其次首 `{` 到末 `}` 的裸花括号），
//! 再做结构化解析。任一阶段失败都降级为自然语言展示，解析失败不是错误。

use serde_json::Value;

/// 「在 enigma-os 中执行」动作的判别标记
pub const EXECUTE_TAG: &str = "execute_in_enigma_os";

/// 推理服务回复被解释出的意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// 向控制台投递命令
    RunCommand(String),
    /// 原样展示给操作者
    NaturalLanguage(String),
}

/// 第一阶段：候选提取。围栏捕获优先于裸花括号捕获。
pub fn extract_candidate(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + "```json".len()..];
        let inner = match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        return Some(inner.trim());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// 第二阶段：结构化解析。判别字段等于 EXECUTE_TAG 且 command 为字符串才算命令；
/// 其余一切（无候选、JSON 非法、判别不符、command 非字符串）都降级为整段原文展示，
/// 原文逐字保留，不做任何修剪。
pub fn parse_action(raw: &str) -> Action {
    let fallback = || Action::NaturalLanguage(raw.to_string());

    let Some(candidate) = extract_candidate(raw) else {
        return fallback();
    };

    let Ok(value) = serde_json::from_str::<Value>(candidate) else {
        return fallback();
    };

    if value.get("type").and_then(Value::as_str) == Some(EXECUTE_TAG) {
        if let Some(command) = value.get("command").and_then(Value::as_str) {
            return Action::RunCommand(command.to_string());
        }
    }
    fallback()
}
