//! 不可靠信道
//!
//! 每个发出的段独立地按概率经历：丢弃、重复、损坏（翻转一个比特）、
//! 额外延迟（让后发的段先到，即乱序）。随机数由种子决定，结果可复现。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::rdt::Segment;
use crate::sim::Tick;

use super::scheduled::DelayLine;
use super::{Channel, ChannelStats};

#[derive(Debug, Error, PartialEq)]
pub enum ChannelError {
    #[error("{field} must be within [0, 1], got {value}")]
    RateOutOfRange { field: &'static str, value: f64 },
    #[error("reorder_rate > 0 needs max_extra_delay >= 1")]
    ZeroReorderDelay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossyConfig {
    /// 基础时延（tick）
    pub latency: u64,
    pub drop_rate: f64,
    pub corrupt_rate: f64,
    /// 被额外延迟的概率
    pub reorder_rate: f64,
    /// 额外延迟的上限（tick），实际值均匀取自 `1..=max_extra_delay`
    pub max_extra_delay: u64,
    pub duplicate_rate: f64,
    pub seed: u64,
}

impl Default for LossyConfig {
    fn default() -> Self {
        Self {
            latency: 1,
            drop_rate: 0.0,
            corrupt_rate: 0.0,
            reorder_rate: 0.0,
            max_extra_delay: 3,
            duplicate_rate: 0.0,
            seed: 0,
        }
    }
}

impl LossyConfig {
    pub fn validate(&self) -> Result<(), ChannelError> {
        for (field, value) in [
            ("drop_rate", self.drop_rate),
            ("corrupt_rate", self.corrupt_rate),
            ("reorder_rate", self.reorder_rate),
            ("duplicate_rate", self.duplicate_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ChannelError::RateOutOfRange { field, value });
            }
        }
        if self.reorder_rate > 0.0 && self.max_extra_delay == 0 {
            return Err(ChannelError::ZeroReorderDelay);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct LossyChannel {
    cfg: LossyConfig,
    rng: StdRng,
    line: DelayLine,
    stats: ChannelStats,
}

impl LossyChannel {
    pub fn new(cfg: LossyConfig) -> Result<Self, ChannelError> {
        cfg.validate()?;
        let rng = StdRng::seed_from_u64(cfg.seed);
        Ok(Self {
            cfg,
            rng,
            line: DelayLine::default(),
            stats: ChannelStats::default(),
        })
    }

    pub fn config(&self) -> &LossyConfig {
        &self.cfg
    }

    fn transmit(&mut self, mut segment: Segment) {
        if self.rng.gen_bool(self.cfg.corrupt_rate) {
            self.stats.corrupted += 1;
            if segment.is_empty() {
                let bit = self.rng.gen_range(0..64);
                segment.flip_seqnum_bit(bit);
            } else {
                let index = self.rng.gen_range(0..segment.len());
                let bit = self.rng.gen_range(0..8);
                segment.flip_payload_bit(index, bit);
            }
            trace!(seqnum = segment.seqnum(), "信道损坏段");
        }

        let mut delay = self.cfg.latency;
        if self.rng.gen_bool(self.cfg.reorder_rate) {
            self.stats.delayed += 1;
            delay = delay.saturating_add(self.rng.gen_range(1..=self.cfg.max_extra_delay));
        }
        self.line.schedule(delay, segment);
    }
}

impl Channel for LossyChannel {
    fn send(&mut self, segment: Segment) {
        self.stats.sent += 1;
        if self.rng.gen_bool(self.cfg.drop_rate) {
            self.stats.dropped += 1;
            trace!(now = ?self.line.now(), seqnum = segment.seqnum(), kind = ?segment.kind(), "信道丢弃段");
            return;
        }
        if self.rng.gen_bool(self.cfg.duplicate_rate) {
            self.stats.duplicated += 1;
            self.transmit(segment.clone());
        }
        self.transmit(segment);
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
