//! 端点统计信息
//!
//! 仅用于观测，不影响协议行为。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStats {
    /// 首次发送的数据段
    pub data_sent: u64,
    /// 重传次数（超时 + 快速重传）
    pub retransmits: u64,
    /// 超时事件（会话级计数）
    pub timeouts: u64,
    pub fast_retransmits: u64,
    pub acks_sent: u64,
    pub nacks_sent: u64,
    pub acks_received: u64,
    pub nacks_received: u64,
    /// 校验失败被丢弃的段
    pub corrupt_dropped: u64,
    /// 重复的数据段（已交付或已缓存）
    pub duplicates: u64,
    /// 乱序到达、进入重排缓冲的段
    pub buffered: u64,
    pub delivered_bytes: u64,
}
