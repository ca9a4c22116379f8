//! 协议事件记录（用于离线回放/分析）
//!
//! 设计目标：
//! - **结构化**：用 JSON 事件而不是解析文本日志
//! - **轻量**：只在内存中收集，会话结束后一次性写出
//! - **可回放**：每条事件带 tick 与端点角色，可按时间轴重建收发过程

mod types;

pub use types::{VizEvent, VizEventKind, VizLogger};
