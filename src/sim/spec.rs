use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelSpec;
use crate::rdt::RdtConfig;

use super::session::SessionError;

pub const DEFAULT_MAX_TICKS: u64 = 10_000;

fn default_max_ticks() -> u64 {
    DEFAULT_MAX_TICKS
}

/// 一次传输会话的描述（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSpec {
    #[serde(default)]
    pub rdt: RdtConfig,
    /// 发送方 -> 接收方
    #[serde(default)]
    pub forward: ChannelSpec,
    /// 接收方 -> 发送方
    #[serde(default)]
    pub reverse: ChannelSpec,
    #[serde(default)]
    pub data: String,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for SessionSpec {
    fn default() -> Self {
        Self {
            rdt: RdtConfig::default(),
            forward: ChannelSpec::default(),
            reverse: ChannelSpec::default(),
            data: String::new(),
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

impl SessionSpec {
    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        let spec: SessionSpec = serde_json::from_str(raw)?;
        spec.rdt.validate()?;
        Ok(spec)
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}
