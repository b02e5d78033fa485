//! Enigma Shell - LLM 驱动的 enigma-os 串口控制台桥接
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **console**: 控制台引擎抽象、行装配与就绪检测、誊录、命令网关
//! - **core**: 错误、UI 状态投影、会话装配与主控循环
//! - **llm**: 推理服务客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **shell**: 轮次历史、上下文构建、动作解析、单轮编排
//! - **ui**: Ratatui TUI 界面

pub mod config;
pub mod console;
pub mod core;
pub mod llm;
pub mod observability;
pub mod shell;
pub mod ui;
