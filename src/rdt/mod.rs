//! 可靠数据传输（RDT）协议核心
//!
//! 在可能丢包、损坏、乱序、重复的信道之上提供有序、无损的字节流：
//! 序号、累计确认、超时/快速重传、流控窗口与校验。
//! 发送方与接收方是两个独立的状态机，只共享段格式与信道契约。

mod config;
mod endpoint;
mod receiver;
mod segment;
mod sender;
mod stats;

pub use config::{ConfigError, RdtConfig};
pub use endpoint::{Endpoint, EndpointIo, Role};
pub use receiver::Receiver;
pub use segment::{CHECKSUM_LEN, Segment, SegmentKind};
pub use sender::{InFlight, SendError, Sender, SenderState};
pub use stats::EndpointStats;
