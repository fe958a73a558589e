//! 消息前缀过滤

/// 只接受以协议前缀开头的消息体
#[derive(Debug, Clone)]
pub struct MessageFilter {
    prefix: String,
}

impl MessageFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn accepts(&self, body: &str) -> bool {
        body.starts_with(&self.prefix)
    }
}
