//! 信道（Channel）
//!
//! 端点之间唯一共享的对象：不可靠、无序的段传输。协议核心只通过
//! [`Channel`] 的 send/receive 契约使用它。这里同时提供几种实现，
//! 供驱动器和测试使用：
//! - [`PerfectChannel`]：固定时延、不丢不乱
//! - [`LossyChannel`]：按概率丢包/损坏/乱序/重复（可复现的随机种子）
//! - [`ScriptedChannel`]：按 (类型, seqnum, 第几次) 精确注入故障

use serde::{Deserialize, Serialize};

use crate::rdt::Segment;
use crate::sim::Tick;

mod lossy;
mod perfect;
mod scheduled;
mod scripted;

pub use lossy::{ChannelError, LossyChannel, LossyConfig};
pub use perfect::PerfectChannel;
pub use scripted::{Fault, ScriptedChannel};

/// 不可靠信道抽象
pub trait Channel: std::fmt::Debug {
    /// 发送一个段（非阻塞，发出即不管）
    fn send(&mut self, segment: Segment);
    /// 取出自上次调用以来到达的所有段；顺序由信道决定，可能为空
    fn receive(&mut self) -> Vec<Segment>;
    /// 驱动器在每个 tick 开始时调用，推进信道内部时钟
    fn on_tick(&mut self, _now: Tick) {}
    /// 仍在途（尚未可接收）的段数
    fn in_transit(&self) -> usize;
    fn stats(&self) -> &ChannelStats;
}

/// 信道统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub sent: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub corrupted: u64,
    /// 额外延迟（制造乱序）的段
    pub delayed: u64,
    pub duplicated: u64,
}

fn default_latency() -> u64 {
    1
}

/// 信道描述（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelSpec {
    Perfect {
        #[serde(default = "default_latency")]
        latency: u64,
    },
    Lossy(LossyConfig),
}

impl Default for ChannelSpec {
    fn default() -> Self {
        ChannelSpec::Perfect {
            latency: default_latency(),
        }
    }
}

impl ChannelSpec {
    pub fn build(&self) -> Result<Box<dyn Channel>, ChannelError> {
        match self {
            ChannelSpec::Perfect { latency } => Ok(Box::new(PerfectChannel::new(*latency))),
            ChannelSpec::Lossy(cfg) => Ok(Box::new(LossyChannel::new(cfg.clone())?)),
        }
    }
}
