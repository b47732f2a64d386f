//! 串口传输抽象层
//!
//! 提供统一的适配器接口，读写两端可以拆分到不同线程：
//! 后台读线程独占 RX 端，调用方通过互斥锁共享 TX 端。

use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial Error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("Device Error: {0}")]
    Device(String),
    #[error("Read timeout")]
    Timeout,
    #[error("Device not connected")]
    NotConnected,
}

impl LinkError {
    /// 是否为致命错误（设备拔出、权限错误等），读线程遇到后退出
    pub fn is_fatal(&self) -> bool {
        match self {
            LinkError::Io(e) => !matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock),
            LinkError::Serial(_) | LinkError::Device(_) | LinkError::NotConnected => true,
            LinkError::Timeout => false,
        }
    }
}

/// 完整适配器（未拆分）
pub trait SerialAdapter {
    /// 写入一帧（同步）
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// 读取一帧到 `buf`，返回实际读到的字节数
    ///
    /// 读满 `buf` 之前超时返回 `Ok(n)`（n < buf.len()，短读）；
    /// 一个字节都没有读到则返回 `Err(LinkError::Timeout)`。
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// 端口名称（用于日志）
    fn port_name(&self) -> &str;
}

/// 只读端
pub trait RxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// 丢弃输入直到线路空闲（一次读超时），使下一次读取从帧边界开始
    ///
    /// 返回丢弃的字节数。
    fn resync(&mut self) -> Result<usize, LinkError> {
        Ok(0)
    }
}

/// 只写端
pub trait TxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}

/// 可拆分为独立读写端的适配器
pub trait SplittableAdapter: SerialAdapter {
    type RxAdapter: RxAdapter + Send + 'static;
    type TxAdapter: TxAdapter + Send + 'static;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), LinkError>;
}

/// 读取一整帧，处理超时和短读
fn read_frame(reader: &mut dyn Read, buf: &mut [u8]) -> Result<usize, LinkError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(LinkError::Device("serial port closed (EOF)".to_string())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                if filled == 0 {
                    return Err(LinkError::Timeout);
                }
                trace!("short read: {} of {} bytes", filled, buf.len());
                return Ok(filled);
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(LinkError::Io(e)),
        }
    }
    Ok(filled)
}

/// 单次重同步最多丢弃的字节数，线路持续有数据时留给下一轮继续
const RESYNC_MAX_BYTES: usize = 4096;

/// 读取并丢弃数据，直到一次读超时
fn drain_input(reader: &mut dyn Read) -> Result<usize, LinkError> {
    let mut scratch = [0u8; 64];
    let mut discarded = 0;
    while discarded < RESYNC_MAX_BYTES {
        match reader.read(&mut scratch) {
            Ok(0) => return Err(LinkError::Device("serial port closed (EOF)".to_string())),
            Ok(n) => discarded += n,
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(LinkError::Io(e)),
        }
    }
    trace!("resync: discarded {} bytes", discarded);
    Ok(discarded)
}

fn write_frame(writer: &mut dyn Write, bytes: &[u8]) -> Result<(), LinkError> {
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// serialport 实现
// ============================================================================

/// 基于 `serialport` 的串口适配器
pub struct SerialPortAdapter {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialPortAdapter {
    /// 打开串口并清空收发缓冲区
    ///
    /// `read_timeout` 决定读线程检查停止标志的最长间隔。
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, LinkError> {
        let port = serialport::new(port_name, baud_rate).timeout(read_timeout).open()?;
        port.clear(ClearBuffer::All)?;
        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialAdapter for SerialPortAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        write_frame(&mut self.port, bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        read_frame(&mut self.port, buf)
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}

impl SplittableAdapter for SerialPortAdapter {
    type RxAdapter = SerialRxAdapter;
    type TxAdapter = SerialTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), LinkError> {
        let tx_port = self.port.try_clone()?;
        Ok((StreamRx::new(self.port), SerialTxAdapter { port: tx_port }))
    }
}

/// 字节流读端：按帧读取，读超时即视为帧间空闲
pub struct StreamRx<R> {
    reader: R,
}

impl<R: Read> StreamRx<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> RxAdapter for StreamRx<R> {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        read_frame(&mut self.reader, buf)
    }

    fn resync(&mut self) -> Result<usize, LinkError> {
        drain_input(&mut self.reader)
    }
}

/// 串口读端
pub type SerialRxAdapter = StreamRx<Box<dyn SerialPort>>;

/// 串口写端
pub struct SerialTxAdapter {
    port: Box<dyn SerialPort>,
}

impl TxAdapter for SerialTxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        write_frame(&mut self.port, bytes)
    }
}
