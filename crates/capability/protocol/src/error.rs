//! 协议错误类型定义

/// 串口链路错误
///
/// 格式错误的帧（空帧、未结束帧、前缀不匹配）不属于错误，直接丢弃。
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 打开链路失败
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 设备端关闭了链路（读到 0 字节）
    #[error("link closed by device")]
    LinkClosed,

    /// 重连次数耗尽
    #[error("link failed {attempts} times in a row, last error: {last}")]
    RetriesExhausted {
        attempts: u64,
        last: Box<ProtocolError>,
    },
}
