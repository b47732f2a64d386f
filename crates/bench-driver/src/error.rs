//! 驱动层错误类型定义

use crate::transport::LinkError;
use bench_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口传输错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 链路未连接（读线程已因致命错误退出）
    #[error("Link is not connected")]
    NotConnected,

    /// 未指定端口且系统中没有可用串口
    #[error("No serial port found")]
    NoPortFound,

    /// 读线程启动失败
    #[error("IO thread error: {0}")]
    IoThread(String),
}
