//! Builder 模式实现
//!
//! 提供链式构造 `Link` 实例的便捷方式。

use crate::error::DriverError;
use crate::link::Link;
use crate::pipeline::PipelineConfig;
use crate::ports::list_ports;
use crate::transport::SerialPortAdapter;
use bench_protocol::BAUD_RATE;
use tracing::{debug, info};

/// Link Builder（链式构造）
///
/// ```no_run
/// use bench_driver::{LinkBuilder, PipelineConfig};
/// use bench_protocol::FrameVariant;
///
/// let link = LinkBuilder::new()
///     .port("/dev/ttyUSB0")
///     .pipeline_config(PipelineConfig {
///         frame_variant: FrameVariant::Compact,
///         ..Default::default()
///     })
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinkBuilder {
    /// 串口名称（未指定时使用系统中第一个串口）
    port: Option<String>,
    /// 波特率（默认 115200）
    baud_rate: Option<u32>,
    pipeline_config: Option<PipelineConfig>,
}

impl LinkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置串口名称，例如 `/dev/ttyUSB0` 或 `COM3`
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率（可选）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// 打开串口、清空缓冲区并启动读线程
    ///
    /// 不自动重试。
    pub fn build(self) -> Result<Link, DriverError> {
        let port = match self.port {
            Some(port) => port,
            None => {
                let first = list_ports()?.into_iter().next().ok_or(DriverError::NoPortFound)?;
                debug!("No port given, using first available port {}", first.name);
                first.name
            },
        };
        let baud_rate = self.baud_rate.unwrap_or(BAUD_RATE);
        let config = self.pipeline_config.unwrap_or_default();

        info!(
            "Opening {} at {} baud ({} status frames)",
            port, baud_rate, config.frame_variant
        );
        let adapter = SerialPortAdapter::open(&port, baud_rate, config.read_timeout())?;
        Link::new(adapter, Some(config))
    }
}
