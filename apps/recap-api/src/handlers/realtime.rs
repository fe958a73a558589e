//! 实时推送 handler
//!
//! - GET /ws
//!
//! 先过准入闸门：已有活跃连接时直接返回 429，不做订阅。
//! 通过后为本连接订阅一个新的有界通道，把总线消息原样作为文本帧转发，
//! 直到对端断开、发送失败或收到关闭信号。退出时订阅与闸门许可随 drop 释放。

use crate::AppState;
use crate::utils::response::realtime_conflict_error;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use recap_realtime::{GatePermit, INSTRUCTION_TOPIC};
use recap_telemetry::record_gate_rejection;
use std::time::Duration;
use tracing::{debug, info, warn};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn realtime_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(permit) = state.gate.try_permit() else {
        record_gate_rejection();
        warn!(target: "recap.realtime", "realtime_connection_rejected");
        return realtime_conflict_error();
    };
    info!(target: "recap.realtime", "realtime_connection_accepted");
    // 升级失败时闭包被丢弃，许可随之释放
    ws.on_upgrade(move |socket| forward_messages(socket, state, permit))
}

async fn forward_messages(socket: WebSocket, state: AppState, permit: GatePermit) {
    let (subscription, mut messages) = state
        .bus
        .subscription(INSTRUCTION_TOPIC, state.channel_capacity);
    let (mut sender, mut receiver) = socket.split();

    let reason = loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break "shutdown",
            message = messages.recv() => {
                let Some(message) = message else {
                    break "bus_closed";
                };
                // 对端不读时发送会挂起，同样要让位于关闭信号
                tokio::select! {
                    _ = state.shutdown.cancelled() => break "shutdown",
                    sent = sender.send(Message::Text(message)) => {
                        if let Err(err) = sent {
                            debug!(target: "recap.realtime", error = %err, "realtime_send_failed");
                            break "send_failed";
                        }
                    }
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break "peer_closed",
                Some(Err(err)) => {
                    debug!(target: "recap.realtime", error = %err, "realtime_receive_failed");
                    break "peer_error";
                }
                // 客户端消息忽略
                Some(Ok(_)) => {}
            },
        }
    };

    drop(subscription);
    drop(permit);
    info!(target: "recap.realtime", reason, "realtime_connection_closed");
    // 对端可能已不再读取，关闭帧只尽力发送
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sender.close()).await;
}

#[cfg(test)]
mod tests {
    use crate::AppState;
    use crate::routes::create_router;
    use futures::StreamExt;
    use recap_realtime::INSTRUCTION_TOPIC;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite};

    async fn spawn_server(state: AppState) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = create_router(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    async fn wait_until(check: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn forwards_messages_and_rejects_second_client() {
        let state = AppState::new(8);
        let addr = spawn_server(state.clone()).await;
        let url = format!("ws://{addr}/ws");

        let (mut first, _) = connect_async(url.as_str()).await.expect("first client");
        wait_until(|| state.bus.subscriber_count(INSTRUCTION_TOPIC) == 1).await;

        let err = connect_async(url.as_str())
            .await
            .err()
            .expect("second client must be rejected");
        match err {
            tungstenite::Error::Http(response) => assert_eq!(response.status().as_u16(), 429),
            other => panic!("unexpected error: {other}"),
        }
        assert!(state.gate.is_held());
        assert_eq!(state.bus.subscriber_count(INSTRUCTION_TOPIC), 1);

        state.bus.publish(INSTRUCTION_TOPIC, "SORA-42".to_string());
        let frame = tokio::time::timeout(Duration::from_secs(5), first.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("valid frame");
        assert_eq!(frame, tungstenite::Message::Text("SORA-42".to_string()));

        first.close(None).await.expect("close");
        wait_until(|| !state.gate.is_held()).await;
        assert_eq!(state.bus.subscriber_count(INSTRUCTION_TOPIC), 0);

        let (_third, _) = connect_async(url.as_str())
            .await
            .expect("gate released after disconnect");
    }

    #[tokio::test]
    async fn shutdown_releases_gate_and_subscription() {
        let state = AppState::new(8);
        let addr = spawn_server(state.clone()).await;

        let (mut client, _) = connect_async(format!("ws://{addr}/ws").as_str())
            .await
            .expect("client");
        wait_until(|| state.bus.subscriber_count(INSTRUCTION_TOPIC) == 1).await;

        state.shutdown.cancel();
        wait_until(|| !state.gate.is_held()).await;
        assert_eq!(state.bus.subscriber_count(INSTRUCTION_TOPIC), 0);

        // 服务端发送关闭帧后流结束
        let next = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("close in time");
        assert!(matches!(
            next,
            None | Some(Ok(tungstenite::Message::Close(_))) | Some(Err(_))
        ));
    }

    #[tokio::test]
    async fn shutdown_releases_gate_while_peer_is_not_reading() {
        let state = AppState::new(1);
        let addr = spawn_server(state.clone()).await;

        // 客户端不读取，服务端发送最终会卡在 TCP 写缓冲上
        let (_client, _) = connect_async(format!("ws://{addr}/ws").as_str())
            .await
            .expect("client");
        wait_until(|| state.bus.subscriber_count(INSTRUCTION_TOPIC) == 1).await;

        let payload = "SORA-".to_string() + &"0".repeat(1 << 20);
        for _ in 0..500 {
            let delivery = state.bus.publish(INSTRUCTION_TOPIC, payload.clone());
            if delivery.saturated > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        state.shutdown.cancel();
        wait_until(|| !state.gate.is_held()).await;
        assert_eq!(state.bus.subscriber_count(INSTRUCTION_TOPIC), 0);
    }
}
