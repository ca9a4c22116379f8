//! 发送方状态机
//!
//! 每个 tick 按固定顺序工作：
//! 1. 处理到达的 ACK/NACK：累计 ACK `A` 一次性退休所有 seqnum < `A` 的在途段；
//!    NACK `E` 只把 `E` 标记为优先重传（快速重传），从不退休任何段。
//!    距该段最近一次发送不足一个最小 RTT 的 NACK 无法反映那次发送的结果，忽略
//! 2. 在流控窗口允许的范围内切分新数据并发送
//! 3. 超时扫描：在途时间达到 `retransmit_timeout` 的段原样重发
//!
//! 序号以字节计、从 1 开始；段边界在首次发送时确定，重传总是发送同一个段。
//! 没有放弃策略：未确认的数据会一直重传，直到被确认。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::sim::Tick;
use crate::viz::VizEventKind;

use super::endpoint::{Endpoint, EndpointIo, Role};
use super::{ConfigError, EndpointStats, RdtConfig, Segment, SegmentKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("data can only be set before the first tick (sender is at tick {0})")]
    AlreadyStarted(u64),
}

/// 发送方状态（反映最近一次 tick 的行为）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderState {
    /// 没有在途数据，也没有待发数据
    Idle,
    /// 本 tick 发出了新数据
    Sending,
    /// 至少一个段在途，等待确认
    WaitingAck,
    /// 本 tick 发生了超时重传或快速重传
    Retransmit,
}

/// 一个在途段及其计时信息
#[derive(Debug, Clone)]
pub struct InFlight {
    pub segment: Segment,
    pub sent_at: Tick,
    pub retransmit_count: u32,
}

#[derive(Debug)]
pub struct Sender {
    cfg: RdtConfig,
    data: Vec<u8>,
    /// 最早未确认的字节序号
    window_base: u64,
    /// 下一个待发送的字节序号
    window_limit: u64,
    unacked: BTreeMap<u64, InFlight>,
    /// 收到 NACK 后待快速重传的 seqnum
    fast_marks: BTreeSet<u64>,
    /// 观测到的最小往返时间（tick），来自累计 ACK 的采样
    min_rtt: Option<u64>,
    now: Tick,
    state: SenderState,
    stats: EndpointStats,
    done_at: Option<Tick>,
}

impl Sender {
    pub fn new(cfg: RdtConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            data: Vec::new(),
            window_base: 1,
            window_limit: 1,
            unacked: BTreeMap::new(),
            fast_marks: BTreeSet::new(),
            min_rtt: None,
            now: Tick::ZERO,
            state: SenderState::Idle,
            stats: EndpointStats::default(),
            done_at: None,
        })
    }

    /// 构造并装入要发送的数据
    pub fn with_data(cfg: RdtConfig, data: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let mut sender = Self::new(cfg)?;
        sender.data = data.into();
        Ok(sender)
    }

    /// 设置要发送的应用数据；只能在第一次 tick 之前调用。
    pub fn set_data_to_send(&mut self, data: impl Into<Vec<u8>>) -> Result<(), SendError> {
        if self.now != Tick::ZERO {
            return Err(SendError::AlreadyStarted(self.now.0));
        }
        self.data = data.into();
        Ok(())
    }

    pub fn config(&self) -> &RdtConfig {
        &self.cfg
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn window_base(&self) -> u64 {
        self.window_base
    }

    pub fn window_limit(&self) -> u64 {
        self.window_limit
    }

    /// 当前在途（未确认）的字节数，不超过 `flow_control_window`
    pub fn bytes_in_flight(&self) -> u64 {
        self.window_limit - self.window_base
    }

    /// 尚未被完全确认的应用数据
    pub fn outgoing(&self) -> &[u8] {
        let start = ((self.window_base - 1) as usize).min(self.data.len());
        &self.data[start..]
    }

    pub fn unacked(&self) -> &BTreeMap<u64, InFlight> {
        &self.unacked
    }

    pub fn total_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// 已被累计确认的字节数
    pub fn bytes_acked(&self) -> u64 {
        (self.window_base - 1).min(self.total_bytes())
    }

    pub fn done_time(&self) -> Option<Tick> {
        self.done_at
    }

    pub fn min_rtt(&self) -> Option<u64> {
        self.min_rtt
    }

    fn all_sent(&self) -> bool {
        self.window_limit > self.total_bytes()
    }

    fn on_ack(&mut self, ack: u64, io: &mut EndpointIo<'_>) {
        self.stats.acks_received += 1;
        io.emit(self.now, Role::Sender, VizEventKind::RecvAck { seqnum: ack });

        if ack > self.window_limit {
            warn!(now = ?self.now, ack, limit = self.window_limit, "ACK 超出已发送范围，忽略");
            return;
        }
        if ack <= self.window_base {
            trace!(now = ?self.now, ack, base = self.window_base, "旧 ACK");
            return;
        }

        // 退休所有 seqnum < ack 的在途段
        let rest = self.unacked.split_off(&ack);
        let retired = std::mem::replace(&mut self.unacked, rest);
        for seq in retired.keys() {
            self.fast_marks.remove(seq);
        }
        // 触发这个 ACK 的是最后一个被退休的段
        if let Some((_, last)) = retired.last_key_value() {
            let sample = self.now.since(last.sent_at).max(1);
            self.min_rtt = Some(self.min_rtt.map_or(sample, |m| m.min(sample)));
        }
        debug!(now = ?self.now, ack, retired = retired.len(), "累计确认推进窗口");
        self.window_base = ack;
    }

    fn on_nack(&mut self, missing: u64, io: &mut EndpointIo<'_>) {
        self.stats.nacks_received += 1;
        io.emit(self.now, Role::Sender, VizEventKind::RecvNack { seqnum: missing });

        let Some(entry) = self.unacked.get(&missing) else {
            return;
        };
        // 一个 RTT 内重复的 NACK 针对的是更早的那次发送
        let since = self.now.since(entry.sent_at);
        let rtt = self.min_rtt.unwrap_or(1);
        if since >= rtt {
            self.fast_marks.insert(missing);
        } else {
            trace!(now = ?self.now, missing, since, rtt, "最近刚发送过，忽略 NACK");
        }
    }

    fn retransmit(&mut self, seq: u64, io: &mut EndpointIo<'_>) {
        let Some(entry) = self.unacked.get_mut(&seq) else {
            return;
        };
        entry.sent_at = self.now;
        entry.retransmit_count = entry.retransmit_count.saturating_add(1);
        let len = entry.segment.len();
        io.outbound.send(entry.segment.clone());
        self.stats.retransmits += 1;
        io.emit(
            self.now,
            Role::Sender,
            VizEventKind::SendData {
                seqnum: seq,
                len,
                retrans: true,
            },
        );
    }

    fn fill_window(&mut self, io: &mut EndpointIo<'_>) -> bool {
        let window = self.cfg.flow_control_window as u64;
        let total = self.total_bytes();
        let mut sent_any = false;

        while self.bytes_in_flight() < window && !self.all_sent() {
            let room = window - self.bytes_in_flight();
            let remain = total - (self.window_limit - 1);
            let len = (self.cfg.data_length as u64).min(room).min(remain);
            let start = (self.window_limit - 1) as usize;
            let end = start + len as usize;

            let seq = self.window_limit;
            let segment = Segment::data(seq, self.data[start..end].to_vec());
            self.unacked.insert(
                seq,
                InFlight {
                    segment: segment.clone(),
                    sent_at: self.now,
                    retransmit_count: 0,
                },
            );
            self.window_limit += len;

            io.outbound.send(segment);
            self.stats.data_sent += 1;
            io.emit(
                self.now,
                Role::Sender,
                VizEventKind::SendData {
                    seqnum: seq,
                    len: len as usize,
                    retrans: false,
                },
            );
            sent_any = true;
        }

        debug_assert!(self.bytes_in_flight() <= window);
        sent_any
    }

    fn sweep_timeouts(&mut self, io: &mut EndpointIo<'_>) -> bool {
        let rto = self.cfg.retransmit_timeout;
        let now = self.now;
        let expired: Vec<u64> = self
            .unacked
            .iter()
            .filter(|(_, f)| now.since(f.sent_at) >= rto)
            .map(|(&seq, _)| seq)
            .collect();

        for &seq in &expired {
            self.stats.timeouts += 1;
            let count = self.unacked.get(&seq).map_or(0, |f| f.retransmit_count + 1);
            debug!(now = ?now, seq, retransmit_count = count, "超时重传");
            io.emit(
                now,
                Role::Sender,
                VizEventKind::Timeout {
                    seqnum: seq,
                    retransmit_count: count,
                },
            );
            self.retransmit(seq, io);
        }
        !expired.is_empty()
    }
}

impl Endpoint for Sender {
    fn role(&self) -> Role {
        Role::Sender
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn tick(&mut self, io: &mut EndpointIo<'_>) {
        self.now = self.now.next();

        let arrivals = io.inbound.receive();
        if self.done_at.is_some() {
            trace!(now = ?self.now, dropped = arrivals.len(), "传输已完成，忽略到达的段");
            return;
        }

        for seg in arrivals {
            if !seg.verify() {
                self.stats.corrupt_dropped += 1;
                io.emit(
                    self.now,
                    Role::Sender,
                    VizEventKind::CorruptDrop {
                        seqnum: seg.seqnum(),
                    },
                );
                continue;
            }
            match seg.kind() {
                SegmentKind::Ack => self.on_ack(seg.seqnum(), io),
                SegmentKind::Nack => self.on_nack(seg.seqnum(), io),
                SegmentKind::Data => {
                    trace!(now = ?self.now, seqnum = seg.seqnum(), "发送方收到数据段，忽略");
                }
            }
        }

        let mut retransmitted = false;
        for seq in std::mem::take(&mut self.fast_marks) {
            if self.unacked.contains_key(&seq) {
                self.stats.fast_retransmits += 1;
                debug!(now = ?self.now, seq, "NACK 触发快速重传");
                io.emit(self.now, Role::Sender, VizEventKind::FastRetransmit { seqnum: seq });
                self.retransmit(seq, io);
                retransmitted = true;
            }
        }

        let sent_new = self.fill_window(io);
        retransmitted |= self.sweep_timeouts(io);

        self.state = if retransmitted {
            SenderState::Retransmit
        } else if sent_new {
            SenderState::Sending
        } else if !self.unacked.is_empty() {
            SenderState::WaitingAck
        } else {
            SenderState::Idle
        };

        if self.unacked.is_empty() && self.all_sent() {
            self.done_at = Some(self.now);
            info!(now = ?self.now, bytes = self.total_bytes(), timeouts = self.stats.timeouts, "✅ 发送方：全部数据已确认");
            io.emit(self.now, Role::Sender, VizEventKind::Done);
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
