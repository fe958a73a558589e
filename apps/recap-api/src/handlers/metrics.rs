//! 中继指标快照。
//!
//! - GET /metrics

use crate::AppState;
use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use recap_realtime::INSTRUCTION_TOPIC;
use recap_telemetry::metrics;

pub async fn get_metrics(State(state): State<AppState>) -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            bytes_read: snapshot.bytes_read,
            frames_decoded: snapshot.frames_decoded,
            frames_filtered: snapshot.frames_filtered,
            messages_published: snapshot.messages_published,
            deliveries: snapshot.deliveries,
            deliveries_dropped: snapshot.deliveries_dropped,
            gate_rejections: snapshot.gate_rejections,
            link_failures: snapshot.link_failures,
            link_reconnects: snapshot.link_reconnects,
            realtime_connected: state.gate.is_held(),
            subscribers: state.bus.subscriber_count(INSTRUCTION_TOPIC),
        })),
    )
        .into_response()
}
