//! 仿真驱动模块
//!
//! 逻辑时钟、会话驱动器与会话描述。

// 子模块声明
mod session;
mod spec;
mod time;

// 重新导出公共接口
pub use session::{Session, SessionError, SessionReport};
pub use spec::{DEFAULT_MAX_TICKS, SessionSpec};
pub use time::Tick;
