//! 协议常量
//!
//! 构造端点时固定，运行期不可修改。

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("data_length must be at least 1")]
    ZeroDataLength,
    #[error("flow_control_window must be at least 1")]
    ZeroWindow,
    #[error("retransmit_timeout must be at least 1 tick")]
    ZeroTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdtConfig {
    /// 每个数据段的最大载荷（字节）
    pub data_length: usize,
    /// 最多允许在途（未确认）的字节数
    pub flow_control_window: usize,
    /// 超时重传阈值（tick）
    pub retransmit_timeout: u64,
}

impl Default for RdtConfig {
    fn default() -> Self {
        Self {
            data_length: 4,
            flow_control_window: 15,
            retransmit_timeout: 5,
        }
    }
}

impl RdtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_length == 0 {
            return Err(ConfigError::ZeroDataLength);
        }
        if self.flow_control_window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.retransmit_timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
