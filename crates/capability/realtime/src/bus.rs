//! 事件总线
//!
//! topic → 投递通道列表。发布时对每个通道做一次 `try_send`：
//! 通道已满或已关闭的订阅者错过这条消息，发布方既不等待也不失败。
//! 映射表由一把互斥锁保护，锁只在修改/枚举期间持有。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

/// 一次发布的投递结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// 成功入队的订阅者数
    pub delivered: usize,
    /// 通道已满而错过的订阅者数
    pub saturated: usize,
    /// 接收端已关闭的订阅者数（注册仍保留，由订阅者负责注销）
    pub closed: usize,
}

impl Delivery {
    pub fn dropped(&self) -> usize {
        self.saturated + self.closed
    }
}

/// 发布/订阅注册表
pub struct EventBus<T = String> {
    topics: Mutex<HashMap<String, Vec<mpsc::Sender<T>>>>,
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, Vec<mpsc::Sender<T>>>> {
        // 持锁期间没有会 panic 的操作，中毒时直接沿用内部数据
        self.topics.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// 注册通道；同一通道重复注册不会去重
    pub fn subscribe(&self, topic: &str, channel: mpsc::Sender<T>) {
        self.topics()
            .entry(topic.to_string())
            .or_default()
            .push(channel);
    }

    /// 移除第一个匹配的注册；不存在时什么也不做
    pub fn unsubscribe(&self, topic: &str, channel: &mpsc::Sender<T>) {
        let mut topics = self.topics();
        let Some(channels) = topics.get_mut(topic) else {
            return;
        };
        if let Some(index) = channels.iter().position(|c| c.same_channel(channel)) {
            channels.remove(index);
        }
        if channels.is_empty() {
            topics.remove(topic);
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics().get(topic).map_or(0, Vec::len)
    }

    /// 新建容量为 `capacity` 的通道并注册，返回注销守卫与接收端
    pub fn subscription(
        self: &Arc<Self>,
        topic: &str,
        capacity: usize,
    ) -> (Subscription<T>, mpsc::Receiver<T>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        self.subscribe(topic, sender.clone());
        let subscription = Subscription {
            bus: Arc::clone(self),
            topic: topic.to_string(),
            sender,
        };
        (subscription, receiver)
    }
}

impl<T: Clone> EventBus<T> {
    /// 向发布时刻已注册的所有通道投递消息（非阻塞、尽力而为）
    pub fn publish(&self, topic: &str, message: T) -> Delivery {
        let mut delivery = Delivery::default();
        let topics = self.topics();
        let Some(channels) = topics.get(topic) else {
            return delivery;
        };
        for channel in channels {
            match channel.try_send(message.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => delivery.saturated += 1,
                Err(TrySendError::Closed(_)) => delivery.closed += 1,
            }
        }
        trace!(
            target: "recap.bus",
            topic,
            delivered = delivery.delivered,
            saturated = delivery.saturated,
            closed = delivery.closed,
            "bus_published"
        );
        delivery
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 订阅守卫，drop 时从总线注销
pub struct Subscription<T = String> {
    bus: Arc<EventBus<T>>,
    topic: String,
    sender: mpsc::Sender<T>,
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.topic, &self.sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus: EventBus = EventBus::new();
        assert_eq!(bus.publish("instruction", "SORA-1".to_string()), Delivery::default());
    }

    #[test]
    fn test_unsubscribe_removes_first_match_only() {
        let bus: EventBus = EventBus::new();
        let (tx, _rx) = mpsc::channel(1);
        bus.subscribe("instruction", tx.clone());
        bus.subscribe("instruction", tx.clone());
        assert_eq!(bus.subscriber_count("instruction"), 2);

        bus.unsubscribe("instruction", &tx);
        assert_eq!(bus.subscriber_count("instruction"), 1);
        bus.unsubscribe("instruction", &tx);
        assert_eq!(bus.subscriber_count("instruction"), 0);
        // 不存在的注册
        bus.unsubscribe("instruction", &tx);
        bus.unsubscribe("other", &tx);
    }

    #[test]
    fn test_closed_receiver_is_reported() {
        let bus: EventBus = EventBus::new();
        let (tx, rx) = mpsc::channel(1);
        bus.subscribe("instruction", tx);
        drop(rx);

        let delivery = bus.publish("instruction", "SORA-1".to_string());
        assert_eq!(delivery.closed, 1);
        assert_eq!(delivery.dropped(), 1);
        // 总线不自行探测断开
        assert_eq!(bus.subscriber_count("instruction"), 1);
    }

    #[test]
    fn test_subscription_guard_unsubscribes_on_drop() {
        let bus: Arc<EventBus> = Arc::new(EventBus::new());
        let (subscription, _rx) = bus.subscription("instruction", 4);
        assert_eq!(bus.subscriber_count("instruction"), 1);
        drop(subscription);
        assert_eq!(bus.subscriber_count("instruction"), 0);
    }
}
