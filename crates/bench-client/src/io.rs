//! 设备 IO 接口
//!
//! 业务逻辑只通过 [`BenchIo`] 访问设备：发送是即发即忘的，状态读取总是返回最新快照。
//! [`SharedLink`] 允许在运行期间连接、断开和重连，没有连接时发送只记录日志。

use crate::error::ClientError;
use bench_driver::{DeviceState, Link, LinkStatus, MetricsSnapshot};
use bench_protocol::CommandFrame;
use parking_lot::RwLock;
use tracing::info;

/// 设备 IO 接口
pub trait BenchIo: Send + Sync {
    /// 发送一帧，失败只记录日志
    fn send(&self, frame: &CommandFrame);

    /// 最新设备状态
    fn device_state(&self) -> DeviceState;

    /// 是否有可用连接
    fn is_connected(&self) -> bool {
        true
    }
}

impl BenchIo for Link {
    fn send(&self, frame: &CommandFrame) {
        bench_driver::send(frame, Some(self));
    }

    fn device_state(&self) -> DeviceState {
        Link::device_state(self)
    }

    fn is_connected(&self) -> bool {
        Link::is_connected(self)
    }
}

/// 可替换的共享连接
#[derive(Default)]
pub struct SharedLink {
    inner: RwLock<Option<Link>>,
}

impl SharedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 连接指定串口，替换已有连接
    ///
    /// 不自动重试。
    pub fn connect(&self, port: &str) -> Result<(), ClientError> {
        let link = bench_driver::connect(port).ok_or_else(|| ClientError::ConnectionFailed {
            port: port.to_string(),
        })?;
        self.attach(link);
        Ok(())
    }

    /// 使用已构建的链路（自定义 PipelineConfig 或模拟适配器）
    pub fn attach(&self, link: Link) {
        let previous = self.inner.write().replace(link);
        if let Some(previous) = previous {
            info!("Replacing connection on {}", previous.port_name());
        }
    }

    /// 断开连接，没有连接时返回 false
    pub fn disconnect(&self) -> bool {
        let link = self.inner.write().take();
        match link {
            Some(link) => {
                info!("Disconnecting from {}", link.port_name());
                link.close();
                true
            },
            None => false,
        }
    }

    pub fn port_name(&self) -> Option<String> {
        self.inner.read().as_ref().map(|link| link.port_name().to_string())
    }

    pub fn status(&self) -> LinkStatus {
        self.inner
            .read()
            .as_ref()
            .map(|link| link.status())
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.inner.read().as_ref().map(|link| link.metrics())
    }

    /// 清零当前连接的计数器，没有连接时返回 `false`
    pub fn reset_metrics(&self) -> bool {
        match self.inner.read().as_ref() {
            Some(link) => {
                link.reset_metrics();
                true
            },
            None => false,
        }
    }
}

impl BenchIo for SharedLink {
    fn send(&self, frame: &CommandFrame) {
        let guard = self.inner.read();
        bench_driver::send(frame, guard.as_ref());
    }

    fn device_state(&self) -> DeviceState {
        self.inner
            .read()
            .as_ref()
            .map(|link| link.device_state())
            .unwrap_or_default()
    }

    fn is_connected(&self) -> bool {
        self.status().is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_driver::PipelineConfig;
    use bench_driver::mock::MockSerialAdapter;
    use bench_protocol::{Command, ComponentId};

    #[test]
    fn test_shared_link_without_connection() {
        let shared = SharedLink::new();
        assert!(!BenchIo::is_connected(&shared));
        assert_eq!(shared.status(), LinkStatus::Disconnected);
        assert_eq!(shared.port_name(), None);
        assert_eq!(shared.device_state(), DeviceState::default());

        // 没有连接：只记录日志
        shared.send(&CommandFrame::manual(ComponentId::MotorVerticalLeft, Command::VerticalUp));
        assert!(!shared.disconnect());
    }

    #[test]
    fn test_shared_link_attach_and_disconnect() {
        let (adapter, handle) = MockSerialAdapter::new("mock-shared");
        let link = Link::new(adapter, Some(PipelineConfig::default())).unwrap();

        let shared = SharedLink::new();
        shared.attach(link);
        assert!(BenchIo::is_connected(&shared));
        assert_eq!(shared.port_name().as_deref(), Some("mock-shared"));

        let frame = CommandFrame::manual(ComponentId::MotorHorizontal, Command::HorizontalLeft);
        shared.send(&frame);
        assert_eq!(handle.sent_frames(), vec![frame]);
        assert_eq!(shared.metrics().unwrap().tx_frames_total, 1);

        assert!(shared.reset_metrics());
        assert_eq!(shared.metrics().unwrap().tx_frames_total, 0);

        assert!(shared.disconnect());
        assert!(!shared.reset_metrics());
        assert!(!BenchIo::is_connected(&shared));
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let shared = SharedLink::new();
        let err = shared.connect("/dev/not-a-bench-port").unwrap_err();
        assert!(matches!(err, ClientError::ConnectionFailed { .. }));
    }
}
