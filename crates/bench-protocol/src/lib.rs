//! # Bench Protocol
//!
//! 测试台控制器串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 组件 ID、模式、命令枚举
//! - `constants`: 协议常量定义
//! - `control`: 命令帧编解码（主机 → 控制器）
//! - `feedback`: 状态帧解析（控制器 → 主机）
//! - `speed`: 滑块值与物理速度之间的换算
//!
//! ## 字节序
//!
//! 协议使用小端字节序（低字节在前），每个字为 32 位。

pub mod constants;
pub mod control;
pub mod feedback;
pub mod ids;
pub mod speed;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use ids::*;
pub use speed::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u32 },

    /// 文本无法解析为任何已知名称
    #[error("Unknown {field}: {name:?}")]
    UnknownName { field: &'static str, name: String },

    #[error("Field {field} out of range: {value} (max {max})")]
    OutOfRange { field: String, value: f64, max: f64 },
}

/// 小端字节序转 u32
pub fn bytes_to_u32_le(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// 小端字节序转 i32
pub fn bytes_to_i32_le(bytes: [u8; 4]) -> i32 {
    i32::from_le_bytes(bytes)
}

/// u32 转小端字节序
pub fn u32_to_bytes_le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// 从切片中取出第 `index` 个 32 位字（调用方保证长度足够）
pub(crate) fn word_at(bytes: &[u8], index: usize) -> [u8; 4] {
    let start = index * 4;
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[start..start + 4]);
    word
}
