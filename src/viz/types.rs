use serde::{Deserialize, Serialize};

use crate::rdt::Role;

/// 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 发送数据段（`retrans` 表示超时或快速重传）
    SendData { seqnum: u64, len: usize, retrans: bool },
    /// 发送累计 ACK
    SendAck { seqnum: u64 },
    /// 发送 NACK（存在已知空洞）
    SendNack { seqnum: u64 },
    RecvAck { seqnum: u64 },
    RecvNack { seqnum: u64 },
    /// 超时触发重传
    Timeout { seqnum: u64, retransmit_count: u32 },
    /// NACK 触发的快速重传
    FastRetransmit { seqnum: u64 },
    /// 校验失败，静默丢弃（`seqnum` 为段头声称的值，未必可信）
    CorruptDrop { seqnum: u64 },
    /// 按序交付给应用
    Deliver { seqnum: u64, len: usize },
    /// 乱序到达，进入重排缓冲
    Buffer { seqnum: u64, len: usize },
    /// 重复段
    Duplicate { seqnum: u64 },
    /// 端点检测到传输完成
    Done,
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VizEvent {
    pub tick: u64,
    pub role: Role,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

/// 一个简单的事件收集器（存内存，会话结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }

    /// 统计满足条件的事件数
    pub fn count(&self, pred: impl Fn(&VizEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}
