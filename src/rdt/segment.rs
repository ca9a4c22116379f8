//! 段（Segment）
//!
//! 端点之间交换的最小单元：数据段或纯 ACK/NACK 段。
//! 构造时计算校验和，之后不可变；接收方在信任一个段之前调用 [`Segment::verify`]。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 校验和长度（SHA-256，字节）
pub const CHECKSUM_LEN: usize = 32;

/// 段的类型标签（替代 -1/0/1 的整数编码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// 携带载荷的数据段；`seqnum` 为首字节的序号（从 1 开始）
    Data,
    /// 累计确认；`seqnum` 为下一个期望的序号
    Ack,
    /// 否定确认；`seqnum` 为缺失的（下一个期望的）序号
    Nack,
}

impl SegmentKind {
    fn tag(self) -> u8 {
        match self {
            SegmentKind::Data => 0xD0,
            SegmentKind::Ack => 0xA1,
            SegmentKind::Nack => 0xA0,
        }
    }
}

/// 一个段。字段只读；校验和在 [`Segment::new`] 中一次性计算。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    seqnum: u64,
    kind: SegmentKind,
    payload: Vec<u8>,
    checksum: [u8; CHECKSUM_LEN],
}

impl Segment {
    pub fn new(seqnum: u64, kind: SegmentKind, payload: Vec<u8>) -> Self {
        let checksum = digest(seqnum, kind, &payload);
        Self {
            seqnum,
            kind,
            payload,
            checksum,
        }
    }

    /// 构造数据段
    pub fn data(seqnum: u64, payload: Vec<u8>) -> Self {
        Self::new(seqnum, SegmentKind::Data, payload)
    }

    /// 构造累计 ACK（`next_expected` 之前的数据均已收到）
    pub fn ack(next_expected: u64) -> Self {
        Self::new(next_expected, SegmentKind::Ack, Vec::new())
    }

    /// 构造 NACK（`missing` 为接收方缺失的序号）
    pub fn nack(missing: u64) -> Self {
        Self::new(missing, SegmentKind::Nack, Vec::new())
    }

    pub fn seqnum(&self) -> u64 {
        self.seqnum
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn checksum(&self) -> &[u8; CHECKSUM_LEN] {
        &self.checksum
    }

    /// 数据段覆盖的序号区间终点（不含）
    pub fn end_seq(&self) -> u64 {
        self.seqnum.saturating_add(self.payload.len() as u64)
    }

    /// 按当前字段重新计算校验和并与存储值比较；不一致即视为损坏。
    pub fn verify(&self) -> bool {
        digest(self.seqnum, self.kind, &self.payload) == self.checksum
    }

    /// 模拟传输中的比特翻转：只改载荷，不重算校验和。
    ///
    /// 载荷为空时返回 `false`（没有可翻转的字节）。
    pub fn flip_payload_bit(&mut self, index: usize, bit: u8) -> bool {
        if self.payload.is_empty() {
            return false;
        }
        let i = index % self.payload.len();
        self.payload[i] ^= 1 << (bit % 8);
        true
    }

    /// 模拟头部损坏：翻转 `seqnum` 的一个比特，不重算校验和。
    pub fn flip_seqnum_bit(&mut self, bit: u8) {
        self.seqnum ^= 1 << (bit % 64);
    }
}

fn digest(seqnum: u64, kind: SegmentKind, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(seqnum.to_be_bytes());
    hasher.update([kind.tag()]);
    hasher.update((payload.len() as u64).to_be_bytes());
    hasher.update(payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}
