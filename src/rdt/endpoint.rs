//! 端点抽象
//!
//! 发送方和接收方是两个独立的状态机，只共享 [`Segment`](super::Segment) 与
//! [`Channel`] 契约。驱动器每个 tick 对每个端点调用一次 [`Endpoint::tick`]。

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::sim::Tick;
use crate::viz::{VizEvent, VizEventKind, VizLogger};

use super::EndpointStats;

/// 端点角色（构造时固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sender,
    Receiver,
}

/// 一次 tick 中端点可用的 I/O：入向信道、出向信道和可选的事件记录器。
pub struct EndpointIo<'a> {
    pub inbound: &'a mut dyn Channel,
    pub outbound: &'a mut dyn Channel,
    pub viz: Option<&'a mut VizLogger>,
}

impl<'a> EndpointIo<'a> {
    pub fn new(inbound: &'a mut dyn Channel, outbound: &'a mut dyn Channel) -> Self {
        Self {
            inbound,
            outbound,
            viz: None,
        }
    }

    pub fn with_viz(mut self, viz: Option<&'a mut VizLogger>) -> Self {
        self.viz = viz;
        self
    }

    pub(crate) fn emit(&mut self, tick: Tick, role: Role, kind: VizEventKind) {
        if let Some(v) = self.viz.as_deref_mut() {
            v.push(VizEvent {
                tick: tick.0,
                role,
                kind,
            });
        }
    }
}

/// 一侧连接的协议状态机
pub trait Endpoint {
    fn role(&self) -> Role;
    /// 推进一个逻辑时间单位：收取到达的段、更新状态、可能发出新段。
    /// tick 之间不可重入，一次 tick 内的工作是同步且有界的。
    fn tick(&mut self, io: &mut EndpointIo<'_>);
    /// 本端是否已检测到传输结束
    fn is_done(&self) -> bool;
    fn now(&self) -> Tick;
    fn stats(&self) -> &EndpointStats;
}
