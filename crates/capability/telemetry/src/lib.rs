//! 追踪、请求 ID 生成与中继计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub frames_decoded: u64,
    pub frames_filtered: u64,
    pub messages_published: u64,
    pub deliveries: u64,
    pub deliveries_dropped: u64,
    pub gate_rejections: u64,
    pub link_failures: u64,
    pub link_reconnects: u64,
}

/// 中继链路计数器。
pub struct TelemetryMetrics {
    bytes_read: AtomicU64,
    frames_decoded: AtomicU64,
    frames_filtered: AtomicU64,
    messages_published: AtomicU64,
    deliveries: AtomicU64,
    deliveries_dropped: AtomicU64,
    gate_rejections: AtomicU64,
    link_failures: AtomicU64,
    link_reconnects: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            bytes_read: AtomicU64::new(0),
            frames_decoded: AtomicU64::new(0),
            frames_filtered: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            deliveries_dropped: AtomicU64::new(0),
            gate_rejections: AtomicU64::new(0),
            link_failures: AtomicU64::new(0),
            link_reconnects: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            frames_filtered: self.frames_filtered.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
            gate_rejections: self.gate_rejections.load(Ordering::Relaxed),
            link_failures: self.link_failures.load(Ordering::Relaxed),
            link_reconnects: self.link_reconnects.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing；未设置 RUST_LOG 时使用给定的默认过滤规则。
pub fn init_tracing_with_default(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录从串口读到的字节数。
pub fn record_bytes_read(count: u64) {
    metrics().bytes_read.fetch_add(count, Ordering::Relaxed);
}

/// 记录完整解码出的帧。
pub fn record_frame_decoded() {
    metrics().frames_decoded.fetch_add(1, Ordering::Relaxed);
}

/// 记录前缀不匹配而丢弃的帧。
pub fn record_frame_filtered() {
    metrics().frames_filtered.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次发布及其投递结果。
pub fn record_published(delivered: u64, dropped: u64) {
    let metrics = metrics();
    metrics.messages_published.fetch_add(1, Ordering::Relaxed);
    metrics.deliveries.fetch_add(delivered, Ordering::Relaxed);
    metrics
        .deliveries_dropped
        .fetch_add(dropped, Ordering::Relaxed);
}

/// 记录实时连接被闸门拒绝。
pub fn record_gate_rejection() {
    metrics().gate_rejections.fetch_add(1, Ordering::Relaxed);
}

/// 记录串口链路失败。
pub fn record_link_failure() {
    metrics().link_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录串口重连。
pub fn record_link_reconnect() {
    metrics().link_reconnects.fetch_add(1, Ordering::Relaxed);
}
