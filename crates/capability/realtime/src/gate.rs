//! 单连接准入闸门

use std::sync::{Arc, Mutex, MutexGuard};

/// 至多一个持有者的准入闸门
///
/// 第二个尝试者立即得到拒绝，不排队。
#[derive(Debug, Default)]
pub struct ConnectionGate {
    held: Mutex<bool>,
}

impl ConnectionGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, bool> {
        self.held.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// 空闲时转为占用并返回 true；已占用时返回 false 且状态不变
    pub fn try_acquire(&self) -> bool {
        let mut held = self.held();
        if *held {
            return false;
        }
        *held = true;
        true
    }

    /// 无条件释放
    pub fn release(&self) {
        *self.held() = false;
    }

    pub fn is_held(&self) -> bool {
        *self.held()
    }

    /// 获取 RAII 许可，drop 时释放闸门
    pub fn try_permit(self: &Arc<Self>) -> Option<GatePermit> {
        self.try_acquire().then(|| GatePermit {
            gate: Arc::clone(self),
        })
    }
}

/// 闸门许可
#[derive(Debug)]
pub struct GatePermit {
    gate: Arc<ConnectionGate>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
