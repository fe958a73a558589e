//! 设备读取循环
//!
//! 持有帧解码器的解析状态与当前链路。每次读取一个固定大小的字节块，
//! 裁剪块首尾的空白后逐字节喂入解码器，通过前缀过滤的消息交给 [`MessageSink`]。
//!
//! 读取与关闭信号竞争（`tokio::select!`），关闭时立即返回。
//! 链路失败按 [`LinkFailurePolicy`] 处理：快速失败或退避重连。

use crate::error::ProtocolError;
use crate::filter::MessageFilter;
use crate::frame::FrameDecoder;
use crate::types::{LinkFailurePolicy, ReaderConfig};
use async_trait::async_trait;
use recap_telemetry::{
    record_bytes_read, record_frame_decoded, record_frame_filtered, record_link_failure,
    record_link_reconnect,
};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 已打开的字节链路
pub type Link = Box<dyn AsyncRead + Send + Unpin>;

/// 链路连接器（串口或测试替身）
#[async_trait]
pub trait LinkConnector: Send + Sync {
    async fn connect(&self) -> Result<Link, ProtocolError>;

    /// 日志中使用的链路描述
    fn describe(&self) -> String;
}

/// 接收通过过滤的消息（不得阻塞）
pub trait MessageSink: Send + Sync {
    fn deliver(&self, message: String);
}

/// 设备读取器
pub struct DeviceReader {
    config: ReaderConfig,
    decoder: FrameDecoder,
    filter: MessageFilter,
}

impl DeviceReader {
    pub fn new(config: ReaderConfig) -> Self {
        let filter = MessageFilter::new(config.message_prefix.clone());
        Self {
            config,
            decoder: FrameDecoder::new(),
            filter,
        }
    }

    /// 处理一次读取得到的字节块，返回转发的消息数
    pub fn process_chunk(&mut self, chunk: &[u8], sink: &dyn MessageSink) -> usize {
        let chunk = trim_space(chunk);
        if chunk.is_empty() {
            return 0;
        }
        debug!(
            target: "recap.reader",
            chunk = %String::from_utf8_lossy(chunk),
            "serial_chunk_received"
        );

        let filter = &self.filter;
        let mut forwarded = 0;
        for message in self.decoder.frames(chunk) {
            record_frame_decoded();
            if filter.accepts(&message) {
                debug!(target: "recap.reader", message = %message, "frame_accepted");
                sink.deliver(message);
                forwarded += 1;
            } else {
                record_frame_filtered();
                debug!(target: "recap.reader", message = %message, "frame_filtered");
            }
        }
        forwarded
    }

    /// 运行读取循环，直到关闭信号（返回 Ok）或链路失败无法恢复（返回 Err）
    pub async fn run(
        &mut self,
        connector: &dyn LinkConnector,
        sink: &dyn MessageSink,
        shutdown: CancellationToken,
    ) -> Result<(), ProtocolError> {
        let link_name = connector.describe();
        let mut consecutive_failures = 0u64;

        loop {
            let connected = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                connected = connector.connect() => connected,
            };

            let outcome = match connected {
                Ok(link) => {
                    info!(target: "recap.reader", link = %link_name, "device_link_ready");
                    self.read_link(link, sink, &shutdown, &mut consecutive_failures)
                        .await
                }
                Err(err) => Err(err),
            };

            let err = match outcome {
                Ok(()) => {
                    info!(target: "recap.reader", link = %link_name, "device_reader_stopped");
                    return Ok(());
                }
                Err(err) => err,
            };

            record_link_failure();
            // 新链路上的字节与旧的半截消息无关
            self.decoder.reset();

            match self.config.failure_policy {
                LinkFailurePolicy::Fatal => {
                    error!(target: "recap.reader", link = %link_name, error = %err, "device_link_failed");
                    return Err(err);
                }
                LinkFailurePolicy::Retry {
                    max_retries,
                    backoff,
                } => {
                    consecutive_failures += 1;
                    if consecutive_failures > max_retries {
                        error!(
                            target: "recap.reader",
                            link = %link_name,
                            attempts = consecutive_failures,
                            error = %err,
                            "device_link_retries_exhausted"
                        );
                        return Err(ProtocolError::RetriesExhausted {
                            attempts: consecutive_failures,
                            last: Box::new(err),
                        });
                    }
                    warn!(
                        target: "recap.reader",
                        link = %link_name,
                        attempt = consecutive_failures,
                        max_retries,
                        backoff = ?backoff,
                        error = %err,
                        "device_link_failed_retrying"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    record_link_reconnect();
                }
            }
        }
    }

    async fn read_link(
        &mut self,
        mut link: Link,
        sink: &dyn MessageSink,
        shutdown: &CancellationToken,
        consecutive_failures: &mut u64,
    ) -> Result<(), ProtocolError> {
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        loop {
            let read = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                read = link.read(&mut buf) => read,
            };
            match read {
                Ok(0) => return Err(ProtocolError::LinkClosed),
                Ok(n) => {
                    *consecutive_failures = 0;
                    record_bytes_read(n as u64);
                    self.process_chunk(&buf[..n], sink);
                }
                Err(err) if is_transient(&err) => {
                    debug!(target: "recap.reader", error = %err, "transient_read_error");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// 裁剪首尾空白；ASCII 空白之外还包括垂直制表符 `\x0B`
fn trim_space(chunk: &[u8]) -> &[u8] {
    let is_space = |byte: &u8| byte.is_ascii_whitespace() || *byte == 0x0B;
    let start = chunk.iter().position(|b| !is_space(b)).unwrap_or(chunk.len());
    let end = chunk.iter().rposition(|b| !is_space(b)).map_or(start, |i| i + 1);
    &chunk[start..end]
}

/// 读超时、被信号中断等不视为链路失败
fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_space() {
        assert_eq!(trim_space(b"\x0B\t <SORA-1>\r\n\x0B"), b"<SORA-1>");
        assert_eq!(trim_space(b" \x0B\x0C "), b"");
        assert_eq!(trim_space(b""), b"");
        assert_eq!(trim_space(b"<A B>"), b"<A B>");
    }

    #[test]
    fn test_transient_kinds() {
        assert!(is_transient(&std::io::Error::from(ErrorKind::TimedOut)));
        assert!(is_transient(&std::io::Error::from(ErrorKind::Interrupted)));
        assert!(!is_transient(&std::io::Error::from(ErrorKind::BrokenPipe)));
        assert!(!is_transient(&std::io::Error::from(ErrorKind::NotFound)));
    }
}
