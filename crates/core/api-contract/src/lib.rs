//! 稳定的 DTO 与 API 响应契约。

use serde::Serialize;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 实时连接冲突错误码（已有活跃连接）。
pub const REALTIME_CONFLICT: &str = "REALTIME.CONFLICT";

/// 中继指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub bytes_read: u64,
    pub frames_decoded: u64,
    pub frames_filtered: u64,
    pub messages_published: u64,
    pub deliveries: u64,
    pub deliveries_dropped: u64,
    pub gate_rejections: u64,
    pub link_failures: u64,
    pub link_reconnects: u64,
    /// 当前是否有实时连接
    pub realtime_connected: bool,
    pub subscribers: usize,
}
