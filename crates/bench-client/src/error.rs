//! 客户端错误类型定义

use bench_driver::DriverError;
use bench_protocol::{Axis, ProtocolError};
use thiserror::Error;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 连接失败（不自动重试）
    #[error("Could not connect to {port}")]
    ConnectionFailed { port: String },

    /// 未选择运动方向
    #[error("Missing desired direction")]
    MissingMovement,

    #[error("Unknown movement: {0:?}")]
    UnknownMovement(String),

    /// 行程超过该轴上限
    #[error("Exceeds maximum value for {axis} axis: {value} (max {max})")]
    ExceedsMaximum { axis: Axis, value: f64, max: f64 },

    #[error("Repetition target must be between 1 and 2147483647, got {0}")]
    InvalidRepetitions(u32),

    /// 已有序列在运行
    #[error("A sequence is already running")]
    AlreadyRunning,

    #[error("Missing program field: {0}")]
    MissingField(String),

    #[error("Invalid value for program field {key}: {value:?}")]
    InvalidField { key: String, value: String },

    #[error("Unknown jog key: {0:?}")]
    UnknownJogKey(char),

    /// 序列线程启动失败
    #[error("Sequence thread error: {0}")]
    Thread(String),
}
