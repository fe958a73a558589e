//! 协议相关类型定义

use std::time::Duration;

/// 起始哨兵 `<` (0x3C)
pub const START_SENTINEL: u8 = b'<';

/// 结束哨兵 `>` (0x3E)
pub const STOP_SENTINEL: u8 = b'>';

/// 默认消息前缀
pub const DEFAULT_MESSAGE_PREFIX: &str = "SORA-";

/// 默认单次读取缓冲区大小（字节）
pub const DEFAULT_READ_BUFFER_SIZE: usize = 32;

/// 链路读失败后的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFailurePolicy {
    /// 首次失败即返回错误，由调用方终止进程
    Fatal,
    /// 等待 `backoff` 后重新打开链路；连续失败超过 `max_retries` 次返回错误
    Retry { max_retries: u64, backoff: Duration },
}

impl Default for LinkFailurePolicy {
    fn default() -> Self {
        Self::Retry {
            max_retries: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// 读取循环配置
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// 消息前缀，只有以此开头的消息会被转发
    pub message_prefix: String,
    /// 单次读取缓冲区大小
    pub read_buffer_size: usize,
    /// 链路失败策略
    pub failure_policy: LinkFailurePolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            message_prefix: DEFAULT_MESSAGE_PREFIX.to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            failure_policy: LinkFailurePolicy::default(),
        }
    }
}

/// 串口配置
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// 串口路径（如 `/dev/ttyUSB0`、`COM3`）
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
}
