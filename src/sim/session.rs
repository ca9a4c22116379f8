//! 会话驱动器
//!
//! 持有一对端点（发送方、接收方）和两条单向信道，每一步：
//! 推进信道时钟，然后依次 tick 发送方、接收方。tick 之间不重叠。

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelError, ChannelStats};
use crate::rdt::{ConfigError, Endpoint, EndpointIo, EndpointStats, RdtConfig, Receiver, Sender};
use crate::viz::VizLogger;

use super::spec::SessionSpec;
use super::time::Tick;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid channel: {0}")]
    Channel(#[from] ChannelError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid session json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("session incomplete after {ticks} ticks: delivered {delivered}/{total} bytes")]
    Incomplete { ticks: u64, delivered: u64, total: u64 },
}

/// 会话结束（或到达上限）时的汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub ticks: u64,
    pub complete: bool,
    pub total_bytes: u64,
    pub delivered_bytes: u64,
    /// 接收方输出（非 UTF-8 字节按替换字符处理）
    pub received: String,
    /// 观测到的最大在途字节数
    pub max_bytes_in_flight: u64,
    pub sender: EndpointStats,
    pub receiver: EndpointStats,
    pub forward: ChannelStats,
    pub reverse: ChannelStats,
}

impl SessionReport {
    pub fn into_result(self) -> Result<Self, SessionError> {
        if self.complete {
            Ok(self)
        } else {
            Err(SessionError::Incomplete {
                ticks: self.ticks,
                delivered: self.delivered_bytes,
                total: self.total_bytes,
            })
        }
    }
}

pub struct Session {
    now: Tick,
    sender: Sender,
    receiver: Receiver,
    /// 发送方 -> 接收方
    forward: Box<dyn Channel>,
    /// 接收方 -> 发送方
    reverse: Box<dyn Channel>,
    max_bytes_in_flight: u64,
    pub viz: Option<VizLogger>,
}

impl Session {
    pub fn new(
        cfg: RdtConfig,
        data: impl Into<Vec<u8>>,
        forward: Box<dyn Channel>,
        reverse: Box<dyn Channel>,
    ) -> Result<Self, ConfigError> {
        let data = data.into();
        let receiver = Receiver::new().expect_len(data.len() as u64);
        let sender = Sender::with_data(cfg, data)?;
        Ok(Self {
            now: Tick::ZERO,
            sender,
            receiver,
            forward,
            reverse,
            max_bytes_in_flight: 0,
            viz: None,
        })
    }

    pub fn from_spec(spec: &SessionSpec) -> Result<Self, SessionError> {
        Self::from_spec_with_data(spec, spec.data.as_bytes())
    }

    /// 使用 `spec` 的配置和信道，但发送任意字节数据（不要求 UTF-8）
    pub fn from_spec_with_data(spec: &SessionSpec, data: impl Into<Vec<u8>>) -> Result<Self, SessionError> {
        let forward = spec.forward.build()?;
        let reverse = spec.reverse.build()?;
        Ok(Self::new(spec.rdt, data, forward, reverse)?)
    }

    pub fn enable_viz(&mut self) {
        self.viz.get_or_insert_with(VizLogger::default);
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn forward(&self) -> &dyn Channel {
        self.forward.as_ref()
    }

    pub fn reverse(&self) -> &dyn Channel {
        self.reverse.as_ref()
    }

    /// 双方都已检测到传输结束
    pub fn is_complete(&self) -> bool {
        self.sender.is_done() && self.receiver.is_done()
    }

    /// 推进一个 tick
    pub fn step(&mut self) {
        self.now = self.now.next();
        self.forward.on_tick(self.now);
        self.reverse.on_tick(self.now);

        let mut io = EndpointIo::new(self.reverse.as_mut(), self.forward.as_mut()).with_viz(self.viz.as_mut());
        self.sender.tick(&mut io);

        let mut io = EndpointIo::new(self.forward.as_mut(), self.reverse.as_mut()).with_viz(self.viz.as_mut());
        self.receiver.tick(&mut io);

        self.max_bytes_in_flight = self.max_bytes_in_flight.max(self.sender.bytes_in_flight());
        debug!(
            now = ?self.now,
            base = self.sender.window_base(),
            limit = self.sender.window_limit(),
            state = ?self.sender.state(),
            expected = self.receiver.expected_seq(),
            buffered = self.receiver.reorder_buffer().len(),
            "tick 完成"
        );
    }

    /// 运行直到完成或到达 `max_ticks`（含已运行的 tick）。
    #[tracing::instrument(skip(self))]
    pub fn run_until(&mut self, max_ticks: u64) -> SessionReport {
        info!(bytes = self.sender.total_bytes(), "▶️  开始传输");
        while !self.is_complete() && self.now.0 < max_ticks {
            self.step();
        }

        let report = self.report();
        if report.complete {
            info!(
                ticks = report.ticks,
                timeouts = report.sender.timeouts,
                retransmits = report.sender.retransmits,
                "✅ 传输完成"
            );
        } else {
            warn!(
                ticks = report.ticks,
                delivered = report.delivered_bytes,
                total = report.total_bytes,
                "到达 tick 上限，传输未完成"
            );
        }
        report
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            ticks: self.now.0,
            complete: self.is_complete(),
            total_bytes: self.sender.total_bytes(),
            delivered_bytes: self.receiver.delivered_len(),
            received: self.receiver.data_received_lossy(),
            max_bytes_in_flight: self.max_bytes_in_flight,
            sender: self.sender.stats().clone(),
            receiver: self.receiver.stats().clone(),
            forward: self.forward.stats().clone(),
            reverse: self.reverse.stats().clone(),
        }
    }
}
