//! 控制台侧：引擎抽象（engine/scripted）、行装配与就绪检测（assembler）、
//! 誊录缓冲（transcript）、命令网关（gateway）

pub mod assembler;
pub mod engine;
pub mod gateway;
pub mod scripted;
pub mod transcript;

pub use assembler::{ByteOutcome, LineAssembler};
pub use engine::{ConsoleEngine, ProcessConsole};
pub use gateway::CommandGateway;
pub use scripted::ScriptedConsole;
pub use transcript::TranscriptBuffer;
