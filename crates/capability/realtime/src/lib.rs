//! # 实时推送能力模块
//!
//! - [`EventBus`]：按 topic 分组的发布/订阅注册表，发布方永不阻塞
//! - [`ConnectionGate`]：保证任一时刻至多一个实时消费者
//!
//! ```text
//! DeviceReader ──publish──► EventBus ──try_send──► 订阅者通道 ──► WebSocket
//!                                                       ▲
//!                              ConnectionGate ──准入────┘
//! ```

mod bus;
mod gate;

pub use bus::{Delivery, EventBus, Subscription};
pub use gate::{ConnectionGate, GatePermit};

/// 读卡器消息使用的唯一 topic
pub const INSTRUCTION_TOPIC: &str = "instruction";
