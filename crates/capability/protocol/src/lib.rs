//! # 读卡器串口能力模块
//!
//! 从串口读取读卡器的原始字节流，按哨兵字节切分为消息帧，
//! 过滤出带有协议前缀的消息后交给下游（事件总线）。
//!
//! ## 架构设计
//!
//! ```text
//! LinkConnector (串口 / 测试用脚本链路)
//!       │  原始字节块
//!       ▼
//! DeviceReader ── 裁剪空白 ──► FrameDecoder ──► MessageFilter
//!                                                   │
//!                                                   ▼
//!                                             MessageSink (发布到事件总线)
//! ```
//!
//! ## 帧格式
//!
//! ```text
//! <SORA-0A1B2C3D>
//! ^             ^
//! 起始哨兵      结束哨兵
//! ```
//!
//! 哨兵不可转义：消息体内不能出现 `<` 或 `>`。消息体中途遇到新的 `<`
//! 时丢弃已累积内容并重新开始（用于从半截读取中重新同步）。

mod error;
mod filter;
mod frame;
mod reader;
mod serial;
mod types;

pub use error::ProtocolError;
pub use filter::MessageFilter;
pub use frame::{FrameDecoder, Frames};
pub use reader::{DeviceReader, Link, LinkConnector, MessageSink};
pub use serial::{SerialConnector, available_ports};
pub use types::*;
