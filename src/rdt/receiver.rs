//! 接收方状态机
//!
//! 每个 tick 取出所有到达的段（数量、顺序都不确定）：
//! - 校验失败：静默丢弃，不 ACK 也不 NACK，靠发送方超时重传
//! - `seqnum == expected`：交付并推进，然后从重排缓冲中连续取出后续段
//! - `seqnum > expected`：放入重排缓冲，暂不交付
//! - `seqnum < expected`：重复段，丢弃但仍然回 ACK（发送方的 ACK 可能丢了）
//!
//! 本 tick 有经过校验的段到达时，发出且只发出一个汇总当前 `expected` 的段：
//! 重排缓冲非空（已知存在空洞）时为 NACK，否则为累计 ACK。

use std::collections::BTreeMap;

use tracing::{debug, info, trace};

use crate::sim::Tick;
use crate::viz::VizEventKind;

use super::endpoint::{Endpoint, EndpointIo, Role};
use super::{EndpointStats, Segment, SegmentKind};

#[derive(Debug)]
pub struct Receiver {
    /// 下一个需要的连续字节序号
    expected_seq: u64,
    /// 乱序到达、尚未连续的段：seqnum -> payload
    reorder: BTreeMap<u64, Vec<u8>>,
    /// 已交付给应用的数据块（只追加）
    delivered: Vec<Vec<u8>>,
    delivered_len: u64,
    expect_len: Option<u64>,
    now: Tick,
    stats: EndpointStats,
    done_at: Option<Tick>,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    pub fn new() -> Self {
        Self {
            expected_seq: 1,
            reorder: BTreeMap::new(),
            delivered: Vec::new(),
            delivered_len: 0,
            expect_len: None,
            now: Tick::ZERO,
            stats: EndpointStats::default(),
            done_at: None,
        }
    }

    /// 告知接收方总长度，使其能独立判断传输结束
    pub fn expect_len(mut self, total: u64) -> Self {
        self.expect_len = Some(total);
        self
    }

    pub fn expected_seq(&self) -> u64 {
        self.expected_seq
    }

    pub fn reorder_buffer(&self) -> &BTreeMap<u64, Vec<u8>> {
        &self.reorder
    }

    pub fn delivered_chunks(&self) -> &[Vec<u8>] {
        &self.delivered
    }

    pub fn delivered_len(&self) -> u64 {
        self.delivered_len
    }

    /// 当前已交付的连续前缀（会话中途调用也安全）
    pub fn data_received(&self) -> Vec<u8> {
        self.delivered.concat()
    }

    /// [`Receiver::data_received`] 的字符串形式（非 UTF-8 字节按替换字符处理）
    pub fn data_received_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data_received()).into_owned()
    }

    pub fn done_time(&self) -> Option<Tick> {
        self.done_at
    }

    fn deliver(&mut self, seqnum: u64, payload: Vec<u8>, io: &mut EndpointIo<'_>) {
        let len = payload.len();
        self.expected_seq = self.expected_seq.saturating_add(len as u64);
        self.delivered_len = self.delivered_len.saturating_add(len as u64);
        self.stats.delivered_bytes += len as u64;
        self.delivered.push(payload);
        io.emit(self.now, Role::Receiver, VizEventKind::Deliver { seqnum, len });
    }

    /// 从重排缓冲中连续取出已可交付的段
    fn drain_reorder(&mut self, io: &mut EndpointIo<'_>) {
        while let Some(entry) = self.reorder.first_entry() {
            if *entry.key() > self.expected_seq {
                break;
            }
            let (seqnum, payload) = entry.remove_entry();
            let skip = (self.expected_seq - seqnum) as usize;
            if skip < payload.len() {
                self.deliver(self.expected_seq, payload[skip..].to_vec(), io);
            }
        }
    }

    fn on_data(&mut self, seg: Segment, io: &mut EndpointIo<'_>) {
        let seqnum = seg.seqnum();
        if seg.is_empty() {
            trace!(now = ?self.now, seqnum, "空数据段");
            return;
        }

        if seqnum > self.expected_seq {
            if self.reorder.contains_key(&seqnum) {
                self.stats.duplicates += 1;
                io.emit(self.now, Role::Receiver, VizEventKind::Duplicate { seqnum });
                return;
            }
            self.stats.buffered += 1;
            debug!(now = ?self.now, seqnum, expected = self.expected_seq, "乱序段进入重排缓冲");
            io.emit(
                self.now,
                Role::Receiver,
                VizEventKind::Buffer {
                    seqnum,
                    len: seg.len(),
                },
            );
            self.reorder.insert(seqnum, seg.payload().to_vec());
            return;
        }

        if seg.end_seq() <= self.expected_seq {
            self.stats.duplicates += 1;
            trace!(now = ?self.now, seqnum, expected = self.expected_seq, "重复段");
            io.emit(self.now, Role::Receiver, VizEventKind::Duplicate { seqnum });
            return;
        }

        let skip = (self.expected_seq - seqnum) as usize;
        self.deliver(self.expected_seq, seg.payload()[skip..].to_vec(), io);
        self.drain_reorder(io);
    }

    fn respond(&mut self, io: &mut EndpointIo<'_>) {
        let expected = self.expected_seq;
        if self.reorder.is_empty() {
            io.outbound.send(Segment::ack(expected));
            self.stats.acks_sent += 1;
            io.emit(self.now, Role::Receiver, VizEventKind::SendAck { seqnum: expected });
        } else {
            io.outbound.send(Segment::nack(expected));
            self.stats.nacks_sent += 1;
            io.emit(self.now, Role::Receiver, VizEventKind::SendNack { seqnum: expected });
        }
    }
}

impl Endpoint for Receiver {
    fn role(&self) -> Role {
        Role::Receiver
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn tick(&mut self, io: &mut EndpointIo<'_>) {
        self.now = self.now.next();

        let mut verified = 0usize;
        for seg in io.inbound.receive() {
            if !seg.verify() {
                self.stats.corrupt_dropped += 1;
                debug!(now = ?self.now, seqnum = seg.seqnum(), "校验失败，丢弃");
                io.emit(
                    self.now,
                    Role::Receiver,
                    VizEventKind::CorruptDrop {
                        seqnum: seg.seqnum(),
                    },
                );
                continue;
            }
            match seg.kind() {
                SegmentKind::Data => {
                    verified += 1;
                    self.on_data(seg, io);
                }
                SegmentKind::Ack | SegmentKind::Nack => {
                    trace!(now = ?self.now, seqnum = seg.seqnum(), "接收方收到确认段，忽略");
                }
            }
        }

        // 完成后仍然回 ACK：最后一个 ACK 可能丢失，发送方会继续重传
        if verified > 0 {
            self.respond(io);
        }

        if self.done_at.is_none() {
            if let Some(total) = self.expect_len {
                if self.delivered_len >= total {
                    self.done_at = Some(self.now);
                    info!(now = ?self.now, bytes = self.delivered_len, "✅ 接收方：数据接收完整");
                    io.emit(self.now, Role::Receiver, VizEventKind::Done);
                }
            }
        }
    }

    fn is_done(&self) -> bool {
        self.done_at.is_some()
    }

    fn now(&self) -> Tick {
        self.now
    }

    fn stats(&self) -> &EndpointStats {
        &self.stats
    }
}
