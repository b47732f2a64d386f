//! 链路句柄
//!
//! `Link` 拥有串口连接和后台读线程，Drop 时停止读线程。
//! 写端由互斥锁保护，发送是同步的。

use crate::builder::LinkBuilder;
use crate::error::DriverError;
use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::pipeline::{PipelineConfig, rx_loop};
use crate::state::{DeviceState, LinkContext};
use crate::status::{AtomicLinkStatus, LinkStatus};
use crate::transport::{SplittableAdapter, TxAdapter};
use bench_protocol::CommandFrame;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info, trace, warn};

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程负责真正的 join
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 设备句柄（对外 API）
pub struct Link {
    /// 写端
    tx: Mutex<Box<dyn TxAdapter + Send>>,
    /// 共享设备状态
    ctx: Arc<LinkContext>,
    /// 读线程句柄（Drop 时 join）
    rx_thread: Option<JoinHandle<()>>,
    /// 运行标志
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
    status: Arc<AtomicLinkStatus>,
    /// 端口名称
    port_name: String,
}

impl Link {
    /// 拆分适配器并启动读线程
    pub fn new<A>(adapter: A, config: Option<PipelineConfig>) -> Result<Self, DriverError>
    where
        A: SplittableAdapter,
    {
        let config = config.unwrap_or_default();
        let port_name = adapter.port_name().to_string();
        let status = Arc::new(AtomicLinkStatus::new(LinkStatus::Connecting));

        let (rx, tx) = adapter.split()?;

        let ctx = Arc::new(LinkContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(LinkMetrics::new());

        let rx_thread = {
            let ctx = ctx.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            let status = status.clone();
            std::thread::Builder::new()
                .name("bench-link-rx".to_string())
                .spawn(move || rx_loop(rx, ctx, config, is_running, metrics, status))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        // 读线程可能已经因致命错误把状态置为 Disconnected，此时保持不变
        status.compare_exchange(
            LinkStatus::Connecting,
            LinkStatus::Connected,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        info!("Link connected on {}", port_name);

        Ok(Self {
            tx: Mutex::new(Box::new(tx)),
            ctx,
            rx_thread: Some(rx_thread),
            is_running,
            metrics,
            status,
            port_name,
        })
    }

    /// 同步发送一帧命令
    ///
    /// 链路已断开时返回 `DriverError::NotConnected`。
    pub fn send(&self, frame: &CommandFrame) -> Result<(), DriverError> {
        if !self.is_connected() {
            return Err(DriverError::NotConnected);
        }

        trace!(
            "TX frame: id={:?} mode={:?} command={:?} data={}",
            frame.id, frame.mode, frame.command, frame.data
        );

        let result = self.tx.lock().send(&frame.to_bytes());
        match result {
            Ok(()) => {
                self.metrics.tx_frames_total.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.metrics.device_errors.fetch_add(1, Ordering::Relaxed);
                if e.is_fatal() {
                    error!("TX: fatal serial error on {}: {}", self.port_name, e);
                    self.status.set(LinkStatus::Disconnected, Ordering::Release);
                }
                Err(e.into())
            },
        }
    }

    /// 最新设备状态快照
    pub fn device_state(&self) -> DeviceState {
        self.ctx.snapshot()
    }

    /// 共享状态上下文
    pub fn context(&self) -> Arc<LinkContext> {
        self.ctx.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub fn status(&self) -> LinkStatus {
        self.status.get(Ordering::Acquire)
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// 主动关闭链路（等价于 drop）
    pub fn close(self) {
        drop(self);
    }

    fn shutdown(&mut self) {
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.rx_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "RX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        self.status.set(LinkStatus::Disconnected, Ordering::Release);
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.shutdown();
        info!("Link on {} closed", self.port_name);
    }
}

/// 打开串口并返回句柄，失败返回 `None`
///
/// 不自动重试，由调用方决定是否重新调用。
pub fn connect(port_name: &str) -> Option<Link> {
    match LinkBuilder::new().port(port_name).build() {
        Ok(link) => Some(link),
        Err(e) => {
            error!("Failed to connect to {}: {}", port_name, e);
            None
        },
    }
}

/// 发送一帧；没有句柄或发送失败时只记录日志，不返回错误
pub fn send(frame: &CommandFrame, link: Option<&Link>) {
    let Some(link) = link else {
        warn!("Could not send data: no device connected ({:?})", frame);
        return;
    };

    if let Err(e) = link.send(frame) {
        warn!("Could not send data to {}: {}", link.port_name(), e);
    }
}
