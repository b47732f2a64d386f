//! # Bench Driver
//!
//! 测试台串口驱动层，包括：
//! - 串口适配器抽象（读写拆分）
//! - 后台读线程（状态帧解析，设备状态单写者）
//! - 设备状态同步（ArcSwap 无锁读取）
//! - 链路状态与性能指标
//!
//! 大多数用户应该使用 `bench-client` 提供的更高级接口。

mod builder;
mod error;
pub mod link;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pipeline;
pub mod ports;
pub mod state;
pub mod status;
pub mod transport;

pub use builder::LinkBuilder;
pub use error::DriverError;
pub use link::{Link, connect, send};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, rx_loop};
pub use ports::{PortInfo, list_ports};
pub use state::{DeviceState, LinkContext};
pub use status::{AtomicLinkStatus, LinkStatus};
pub use transport::{
    LinkError, RxAdapter, SerialAdapter, SerialPortAdapter, SplittableAdapter, TxAdapter,
};
