//! 脚本化信道
//!
//! 用于可复现的场景：对“某类段、某个 seqnum、第 n 次发送”精确注入故障，
//! 其余段按固定时延正常交付。

use std::collections::HashMap;

use tracing::debug;

use crate::rdt::{Segment, SegmentKind};
use crate::sim::Tick;

use super::scheduled::DelayLine;
use super::{Channel, ChannelStats};

/// 注入的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Drop,
    /// 翻转载荷第 `byte` 个字节的最低位（空载荷时翻转 seqnum）
    Corrupt { byte: usize },
    /// 在基础时延之上再延迟若干 tick
    Delay(u64),
    Duplicate,
}

#[derive(Debug, Clone)]
struct Rule {
    kind: SegmentKind,
    seqnum: u64,
    occurrence: u32,
    fault: Fault,
}

#[derive(Debug)]
pub struct ScriptedChannel {
    latency: u64,
    rules: Vec<Rule>,
    seen: HashMap<(SegmentKind, u64), u32>,
    line: DelayLine,
    stats: ChannelStats,
}

impl ScriptedChannel {
    pub fn new(latency: u64) -> Self {
        Self {
            latency,
            rules: Vec::new(),
            seen: HashMap::new(),
            line: DelayLine::default(),
            stats: ChannelStats::default(),
        }
    }

    /// 对 (`kind`, `seqnum`) 的第 `occurrence` 次发送（从 1 开始）注入 `fault`
    pub fn with_fault(mut self, kind: SegmentKind, seqnum: u64, occurrence: u32, fault: Fault) -> Self {
        self.rules.push(Rule {
            kind,
            seqnum,
            occurrence,
            fault,
        });
        self
    }

    /// 数据段 `seqnum` 的首次发送注入 `fault`
    pub fn on_first_data(self, seqnum: u64, fault: Fault) -> Self {
        self.with_fault(SegmentKind::Data, seqnum, 1, fault)
    }

    fn fault_for(&mut self, segment: &Segment) -> Option<Fault> {
        let key = (segment.kind(), segment.seqnum());
        let n = self.seen.entry(key).or_insert(0);
        *n += 1;
        let n = *n;
        self.rules
            .iter()
            .find(|r| r.kind == key.0 && r.seqnum == key.1 && r.occurrence == n)
            .map(|r| r.fault)
    }
}

impl Channel for ScriptedChannel {
    fn send(&mut self, mut segment: Segment) {
        self.stats.sent += 1;
        let Some(fault) = self.fault_for(&segment) else {
            self.line.schedule(self.latency, segment);
            return;
        };
        debug!(now = ?self.line.now(), seqnum = segment.seqnum(), kind = ?segment.kind(), ?fault, "注入故障");
        match fault {
            Fault::Drop => {
                self.stats.dropped += 1;
            }
            Fault::Corrupt { byte } => {
                self.stats.corrupted += 1;
                if !segment.flip_payload_bit(byte, 0) {
                    segment.flip_seqnum_bit(0);
                }
                self.line.schedule(self.latency, segment);
            }
            Fault::Delay(extra) => {
                self.stats.delayed += 1;
                self.line.schedule(self.latency.saturating_add(extra), segment);
            }
            Fault::Duplicate => {
                self.stats.duplicated += 1;
                self.line.schedule(self.latency, segment.clone());
                self.line.schedule(self.latency, segment);
            }
        }
    }

    fn receive(&mut self) -> Vec<Segment> {
        let out = self.line.pop_due();
        self.stats.delivered += out.len() as u64;
        out
    }

    fn on_tick(&mut self, now: Tick) {
        self.line.advance(now);
    }

    fn in_transit(&self) -> usize {
        self.line.len()
    }

    fn stats(&self) -> &ChannelStats {
        &self.stats
    }
}
