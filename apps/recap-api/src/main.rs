//! 读卡器实时中继服务：串口读取 → 事件总线 → 单一 WebSocket 订阅者。

mod handlers;
mod middleware;
mod reader;
mod routes;
mod utils;

use recap_config::AppConfig;
use recap_realtime::{ConnectionGate, EventBus};
use recap_telemetry::init_tracing_with_default;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 进程级应用上下文，启动时创建一次，注入所有 handler 与读取任务。
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<EventBus>,
    pub gate: Arc<ConnectionGate>,
    /// 进程关闭信号
    pub shutdown: CancellationToken,
    /// 每个实时订阅者的投递通道容量
    pub channel_capacity: usize,
}

impl AppState {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            bus: Arc::new(EventBus::new()),
            gate: Arc::new(ConnectionGate::new()),
            shutdown: CancellationToken::new(),
            channel_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing_with_default(if config.debug { "debug" } else { "info" });

    // 未指定串口时只列出可用串口
    let Some(serial_port) = config.serial_port.clone() else {
        reader::log_available_ports();
        return Ok(());
    };

    let state = AppState::new(config.channel_capacity);
    let reader_task = reader::spawn_device_reader(
        &config,
        serial_port,
        Arc::clone(&state.bus),
        state.shutdown.clone(),
    );
    tokio::spawn(watch_signals(state.shutdown.clone()));

    let app = routes::create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "recap.api", addr = %config.http_addr, "http_listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // HTTP 服务先退出时同样要停止读取任务
    state.shutdown.cancel();
    match reader_task.await? {
        Ok(()) => {
            info!(target: "recap.api", "shut down gracefully");
            Ok(())
        }
        Err(err) => {
            error!(target: "recap.api", error = %err, "device reader failed, exiting");
            Err(err.into())
        }
    }
}

/// Ctrl+C / SIGTERM 触发关闭信号
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target: "recap.api", error = %err, "failed to listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(target: "recap.api", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = shutdown.cancelled() => return,
    }
    info!(target: "recap.api", "shutdown signal received");
    shutdown.cancel();
}
