//! 逻辑时钟
//!
//! 驱动器每一步推进一个 tick；协议里的所有“时间”都用 tick 计量。

use serde::{Deserialize, Serialize};

/// 逻辑时间（tick 数）。第一次 tick 之后为 `Tick(1)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn next(self) -> Tick {
        Tick(self.0.saturating_add(1))
    }

    pub fn after(self, ticks: u64) -> Tick {
        Tick(self.0.saturating_add(ticks))
    }

    /// 自 `earlier` 以来经过的 tick 数（不会下溢）
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}
