//! 读卡器链路装配模块
//!
//! 将串口连接器、设备读取器与事件总线组装在一起：
//! 读取器过滤后的每条消息都发布到 `instruction` topic。
//! 读取器无法恢复时触发进程关闭信号，由 main 以非零状态退出。

use recap_config::{AppConfig, LinkFailureMode};
use recap_protocol::{
    DeviceReader, LinkConnector, LinkFailurePolicy, MessageSink, ProtocolError, ReaderConfig,
    SerialConfig, SerialConnector, available_ports,
};
use recap_realtime::{EventBus, INSTRUCTION_TOPIC};
use recap_telemetry::record_published;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 把读取器输出发布到事件总线
struct BusSink {
    bus: Arc<EventBus>,
}

impl MessageSink for BusSink {
    fn deliver(&self, message: String) {
        let delivery = self.bus.publish(INSTRUCTION_TOPIC, message);
        record_published(delivery.delivered as u64, delivery.dropped() as u64);
        if delivery.saturated > 0 {
            debug!(
                target: "recap.reader",
                saturated = delivery.saturated,
                "subscriber_channel_full"
            );
        }
    }
}

/// 由应用配置生成读取器配置
pub fn reader_config(config: &AppConfig) -> ReaderConfig {
    let failure_policy = match config.link_failure_mode {
        LinkFailureMode::Fatal => LinkFailurePolicy::Fatal,
        LinkFailureMode::Retry => LinkFailurePolicy::Retry {
            max_retries: config.link_max_retries,
            backoff: Duration::from_millis(config.link_backoff_ms),
        },
    };
    ReaderConfig {
        message_prefix: config.message_prefix.clone(),
        read_buffer_size: config.read_buffer_size,
        failure_policy,
    }
}

/// 运行读取器直到关闭；失败时触发进程关闭信号
pub async fn run_device_reader(
    reader_config: ReaderConfig,
    connector: Arc<dyn LinkConnector>,
    bus: Arc<EventBus>,
    shutdown: CancellationToken,
) -> Result<(), ProtocolError> {
    let sink = BusSink { bus };
    let mut reader = DeviceReader::new(reader_config);
    let result = reader
        .run(connector.as_ref(), &sink, shutdown.clone())
        .await;
    if let Err(err) = &result {
        error!(target: "recap.reader", error = %err, "device_reader_terminated");
        shutdown.cancel();
    }
    result
}

/// 在后台任务中打开串口并运行读取器
pub fn spawn_device_reader(
    config: &AppConfig,
    serial_port: String,
    bus: Arc<EventBus>,
    shutdown: CancellationToken,
) -> JoinHandle<Result<(), ProtocolError>> {
    let connector = Arc::new(SerialConnector::new(SerialConfig {
        port: serial_port,
        baud_rate: config.baud_rate,
    }));
    tokio::spawn(run_device_reader(
        reader_config(config),
        connector,
        bus,
        shutdown,
    ))
}

/// 未配置串口时列出检测到的串口
pub fn log_available_ports() {
    match available_ports() {
        Ok(ports) if ports.is_empty() => {
            warn!(target: "recap.reader", "no serial ports detected");
        }
        Ok(ports) => {
            info!(
                target: "recap.reader",
                "RECAP_SERIAL_PORT is not set; detected serial ports:"
            );
            for port in ports {
                info!(target: "recap.reader", port = %port, "serial_port_detected");
            }
        }
        Err(err) => {
            error!(target: "recap.reader", error = %err, "failed to list serial ports");
        }
    }
}
