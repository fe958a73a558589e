//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 串口读失败后的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFailureMode {
    /// 首次失败即终止进程（快速失败）。
    Fatal,
    /// 退避后重连，连续失败超过上限再终止进程。
    Retry,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未配置时只列出可用串口，不启动服务。
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    pub message_prefix: String,
    pub read_buffer_size: usize,
    pub channel_capacity: usize,
    pub link_failure_mode: LinkFailureMode,
    pub link_max_retries: u64,
    pub link_backoff_ms: u64,
    pub debug: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            env::var("RECAP_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let serial_port = read_optional("RECAP_SERIAL_PORT");
        let baud_rate = read_u32_with_default("RECAP_BAUD_RATE", 115_200)?;
        let message_prefix =
            env::var("RECAP_MESSAGE_PREFIX").unwrap_or_else(|_| "SORA-".to_string());
        let read_buffer_size = read_positive_usize_with_default("RECAP_READ_BUFFER_SIZE", 32)?;
        let channel_capacity = read_positive_usize_with_default("RECAP_CHANNEL_CAPACITY", 32)?;
        let link_failure_mode = read_failure_mode("RECAP_LINK_FAILURE_POLICY")?;
        let link_max_retries = read_u64_with_default("RECAP_LINK_MAX_RETRIES", 5)?;
        let link_backoff_ms = read_u64_with_default("RECAP_LINK_BACKOFF_MS", 1000)?;
        let debug = read_bool_with_default("RECAP_DEBUG", false)?;

        Ok(Self {
            http_addr,
            serial_port,
            baud_rate,
            message_prefix,
            read_buffer_size,
            channel_capacity,
            link_failure_mode,
            link_max_retries,
            link_backoff_ms,
            debug,
        })
    }
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 读取正整数（0 视为非法，缓冲区与通道容量不能为空）。
fn read_positive_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_failure_mode(key: &str) -> Result<LinkFailureMode, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(LinkFailureMode::Retry),
    };
    match value.to_ascii_lowercase().as_str() {
        "retry" => Ok(LinkFailureMode::Retry),
        "fatal" => Ok(LinkFailureMode::Fatal),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> Result<bool, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}
