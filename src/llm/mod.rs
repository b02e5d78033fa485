//! 推理服务客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::MockLlmClient;
pub use openai::{create_local_client, OpenAiClient, TokenUsage};
pub use traits::{LlmClient, Message, Role};
