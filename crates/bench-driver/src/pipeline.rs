//! 后台读线程
//!
//! 负责状态帧的接收、解析和设备状态更新。读线程是设备状态的唯一写者。

use crate::metrics::LinkMetrics;
use crate::state::LinkContext;
use crate::status::{AtomicLinkStatus, LinkStatus};
use crate::transport::{LinkError, RxAdapter};
use bench_protocol::{EXTENDED_STATUS_FRAME_LEN, FrameVariant, StatusFrame};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Pipeline 配置
///
/// ```
/// use bench_driver::PipelineConfig;
/// use bench_protocol::FrameVariant;
///
/// let config = PipelineConfig {
///     poll_interval_ms: 50,
///     read_timeout_ms: 100,
///     frame_variant: FrameVariant::Compact,
/// };
/// assert_eq!(config.frame_len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 空闲轮询间隔（毫秒），与设备发送周期匹配
    pub poll_interval_ms: u64,
    /// 串口读超时（毫秒）
    pub read_timeout_ms: u64,
    /// 状态帧变体（决定每次读取 4 或 8 字节）
    pub frame_variant: FrameVariant,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            read_timeout_ms: 100,
            frame_variant: FrameVariant::Extended,
        }
    }
}

impl PipelineConfig {
    pub fn frame_len(&self) -> usize {
        self.frame_variant.len()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// RX 线程循环
///
/// # 参数
/// - `rx`: 读端适配器（线程独占）
/// - `ctx`: 共享设备状态
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志，置为 false 后在一个读超时内退出
/// - `metrics`: 性能指标
/// - `status`: 链路状态，致命错误时置为 Disconnected
pub fn rx_loop(
    mut rx: impl RxAdapter,
    ctx: Arc<LinkContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
    status: Arc<AtomicLinkStatus>,
) {
    let frame_len = config.frame_len();
    let poll_interval = config.poll_interval();
    let mut buf = [0u8; EXTENDED_STATUS_FRAME_LEN];

    // 打开时设备可能正在发送某一帧的中段
    if !resync(&mut rx, &metrics, &status, &is_running) {
        return;
    }

    loop {
        // Acquire: 看到 false 时，关闭方之前的写入都可见
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let misaligned = match rx.receive(&mut buf[..frame_len]) {
            Ok(n) if n == frame_len => match StatusFrame::parse(&buf[..frame_len]) {
                Ok(frame) if frame.is_well_formed() => {
                    metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
                    trace!(
                        "RX frame: id={} movement={} motor={:?} position={:?}",
                        frame.id, frame.movement_status, frame.motor_state, frame.position
                    );
                    ctx.apply(&frame);
                    // 立即读取积压的下一帧
                    continue;
                },
                Ok(frame) => {
                    metrics.rx_decode_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "RX thread: malformed status frame (id={} motor={:?}), realigning",
                        frame.id, frame.motor_state
                    );
                    true
                },
                Err(e) => {
                    metrics.rx_decode_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("RX thread: failed to decode status frame: {}", e);
                    true
                },
            },
            Ok(n) => {
                // 短读：本次不更新状态，剩余字节会与下一帧错位
                metrics.rx_short_reads.fetch_add(1, Ordering::Relaxed);
                debug!("RX thread: short read ({} of {} bytes), dropped", n, frame_len);
                true
            },
            Err(LinkError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                false
            },
            Err(e) => {
                if fail(e, &metrics, &status, &is_running) {
                    break;
                }
                false
            },
        };

        if misaligned && !resync(&mut rx, &metrics, &status, &is_running) {
            break;
        }

        spin_sleep::sleep(poll_interval);
    }

    trace!("RX thread: loop exited");
}

/// 丢弃输入直到线路空闲；返回 `false` 表示遇到致命错误，链路已标记断开
fn resync(
    rx: &mut impl RxAdapter,
    metrics: &LinkMetrics,
    status: &AtomicLinkStatus,
    is_running: &AtomicBool,
) -> bool {
    match rx.resync() {
        Ok(discarded) => {
            metrics.rx_resyncs.fetch_add(1, Ordering::Relaxed);
            if discarded > 0 {
                debug!("RX thread: discarded {} bytes to realign frames", discarded);
            }
            true
        },
        Err(e) => !fail(e, metrics, status, is_running),
    }
}

/// 记录读错误；致命错误时标记断开并返回 `true`
fn fail(e: LinkError, metrics: &LinkMetrics, status: &AtomicLinkStatus, is_running: &AtomicBool) -> bool {
    error!("RX thread: serial receive error: {}", e);
    metrics.device_errors.fetch_add(1, Ordering::Relaxed);

    if !e.is_fatal() {
        return false;
    }
    error!("RX thread: fatal error detected, marking link disconnected");
    status.set(LinkStatus::Disconnected, Ordering::Release);
    // Release: 之前的写入对看到 false 的线程可见
    is_running.store(false, Ordering::Release);
    true
}
