//! 核心层：错误（error）、UI 状态投影（state）、会话装配与主控循环（session）

pub mod error;
pub mod session;
pub mod state;

pub use error::BridgeError;
pub use session::{create_session, create_session_with, SessionCommand};
pub use state::{ConsoleStatus, TurnPhase, UiState};
