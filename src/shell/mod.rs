//! 会话侧：轮次与历史（turn）、上下文构建（context）、动作解析（action）、
//! 单轮状态机（orchestrator）

pub mod action;
pub mod context;
pub mod orchestrator;
pub mod turn;

pub use action::{extract_candidate, parse_action, Action, EXECUTE_TAG};
pub use context::ContextBuilder;
pub use orchestrator::{ShellOrchestrator, TurnOutcome};
pub use turn::{Turn, TurnHistory, TurnRole, ROUTED_PREFIX};
