//! 设备状态
//!
//! 设备状态只由读线程写入，其他线程通过 `ArcSwap` 无锁读取最新快照。

use arc_swap::ArcSwap;
use bench_protocol::{MotorState, StatusFrame};
use std::sync::Arc;

/// 最近一次解析得到的设备状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceState {
    /// 上报组件 ID
    pub id: u8,
    /// 运动状态字节
    pub movement_status: u8,
    /// 电机运行状态
    pub motor_state: MotorState,
    /// 绝对位置（紧凑帧不携带，保留上一次的值）
    pub position: i32,
    /// 已应用的状态帧数量
    pub update_count: u64,
}

impl DeviceState {
    /// 在当前状态上应用一帧，返回新状态
    pub fn apply(&self, frame: &StatusFrame) -> Self {
        Self {
            id: frame.id,
            movement_status: frame.movement_status,
            motor_state: frame.motor_state,
            position: frame.position.unwrap_or(self.position),
            update_count: self.update_count.wrapping_add(1),
        }
    }
}

/// 链路上下文（读线程与调用方共享）
pub struct LinkContext {
    /// 设备状态（单写者：读线程）
    pub device: Arc<ArcSwap<DeviceState>>,
}

impl LinkContext {
    pub fn new() -> Self {
        Self {
            device: Arc::new(ArcSwap::from_pointee(DeviceState::default())),
        }
    }

    /// 读取最新快照
    pub fn snapshot(&self) -> DeviceState {
        **self.device.load()
    }

    /// 应用一帧（仅读线程调用）
    pub(crate) fn apply(&self, frame: &StatusFrame) {
        let next = self.device.load().apply(frame);
        self.device.store(Arc::new(next));
    }
}

impl Default for LinkContext {
    fn default() -> Self {
        Self::new()
    }
}
