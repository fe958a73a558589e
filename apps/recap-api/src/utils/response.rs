//! HTTP 错误响应辅助函数
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::{ApiResponse, REALTIME_CONFLICT};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// 已有活跃实时连接（429）
pub fn realtime_conflict_error() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ApiResponse::<()>::error(
            REALTIME_CONFLICT,
            "another realtime connection is already active",
        )),
    )
        .into_response()
}
