//! 理想信道
//!
//! 固定时延，按发送顺序交付，不丢包不损坏。

use crate::rdt::Segment;
use crate::sim::Tick;

use super::scheduled::DelayLine;
use super::{Channel, ChannelStats};

#[derive(Debug)]
pub struct PerfectChannel {
    latency: u64,
    line: DelayLine,
    stats: ChannelStats,
}

impl PerfectChannel {
    pub fn new(latency: u64) -> Self {
        Self {
            latency,
            line: DelayLine::default(),
            stats: ChannelStats::default(),
        }
    }
}

impl Default for PerfectChannel {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Channel for PerfectChannel {
    fn send(&mut self, segment: Segment) {
        self.stats.sent += 1;
        self.line.schedule(self.latency, segment);
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
