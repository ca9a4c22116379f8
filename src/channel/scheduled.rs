//! 延迟线
//!
//! 按到达 tick 排序的在途段集合。同一 tick 到达的段按发送顺序出队。

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::rdt::Segment;
use crate::sim::Tick;

/// 一个在途段：到达时间、发送序号和段本身。
#[derive(Debug)]
pub(crate) struct ScheduledSegment {
    pub(crate) at: Tick,
    pub(crate) seq: u64,
    pub(crate) segment: Segment,
}

// BinaryHeap 是 max-heap；我们需要最早到达优先，因此反向比较。
impl Ord for ScheduledSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.at.cmp(&other.at) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
        .reverse()
    }
}

impl PartialOrd for ScheduledSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledSegment {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledSegment {}

#[derive(Debug, Default)]
pub(crate) struct DelayLine {
    now: Tick,
    next_seq: u64,
    q: BinaryHeap<ScheduledSegment>,
}

impl DelayLine {
    pub(crate) fn now(&self) -> Tick {
        self.now
    }

    pub(crate) fn advance(&mut self, now: Tick) {
        self.now = self.now.max(now);
    }

    /// 安排 `segment` 在 `delay` 个 tick 之后可被接收
    pub(crate) fn schedule(&mut self, delay: u64, segment: Segment) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledSegment {
            at: self.now.after(delay),
            seq,
            segment,
        });
    }

    /// 取出所有已到达（`at <= now`）的段
    pub(crate) fn pop_due(&mut self) -> Vec<Segment> {
        let mut out = Vec::new();
        while let Some(top) = self.q.peek() {
            if top.at > self.now {
                break;
            }
            if let Some(item) = self.q.pop() {
                out.push(item.segment);
            }
        }
        out
    }

    pub(crate) fn len(&self) -> usize {
        self.q.len()
    }
}
