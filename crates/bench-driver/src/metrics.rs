//! 链路性能指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
///
/// ```rust
/// use bench_driver::LinkMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = LinkMetrics::default();
/// metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_frames_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// 成功解析的状态帧数
    pub rx_frames_total: AtomicU64,
    /// 短读次数（超时前未读满一帧）
    pub rx_short_reads: AtomicU64,
    /// 解析失败次数
    pub rx_decode_errors: AtomicU64,
    /// 读超时次数（设备未发送数据时的正常现象）
    pub rx_timeouts: AtomicU64,
    /// 重新对齐帧边界的次数
    pub rx_resyncs: AtomicU64,
    /// 发送的命令帧数
    pub tx_frames_total: AtomicU64,
    /// 设备错误次数
    pub device_errors: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取所有计数器的快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_short_reads: self.rx_short_reads.load(Ordering::Relaxed),
            rx_decode_errors: self.rx_decode_errors.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_resyncs: self.rx_resyncs.load(Ordering::Relaxed),
            tx_frames_total: self.tx_frames_total.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.rx_frames_total.store(0, Ordering::Relaxed);
        self.rx_short_reads.store(0, Ordering::Relaxed);
        self.rx_decode_errors.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
        self.rx_resyncs.store(0, Ordering::Relaxed);
        self.tx_frames_total.store(0, Ordering::Relaxed);
        self.device_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_frames_total: u64,
    pub rx_short_reads: u64,
    pub rx_decode_errors: u64,
    pub rx_timeouts: u64,
    pub rx_resyncs: u64,
    pub tx_frames_total: u64,
    pub device_errors: u64,
}

impl MetricsSnapshot {
    /// 读取健康度：成功帧占所有读尝试（成功 + 短读 + 解析失败）的百分比
    pub fn rx_health_rate(&self) -> f64 {
        let attempts = self.rx_frames_total + self.rx_short_reads + self.rx_decode_errors;
        if attempts == 0 {
            return 0.0;
        }
        (self.rx_frames_total as f64 / attempts as f64) * 100.0
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rx={} short={} decode_err={} timeouts={} resyncs={} tx={} device_err={}",
            self.rx_frames_total,
            self.rx_short_reads,
            self.rx_decode_errors,
            self.rx_timeouts,
            self.rx_resyncs,
            self.tx_frames_total,
            self.device_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = LinkMetrics::new();
        metrics.rx_frames_total.fetch_add(3, Ordering::Relaxed);
        metrics.tx_frames_total.fetch_add(2, Ordering::Relaxed);
        metrics.rx_short_reads.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rx_frames_total, 3);
        assert_eq!(snapshot.tx_frames_total, 2);
        assert_eq!(snapshot.rx_short_reads, 1);

        metrics.rx_resyncs.fetch_add(1, Ordering::Relaxed);
        assert_eq!(metrics.snapshot().rx_resyncs, 1);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_rx_health_rate() {
        let snapshot = MetricsSnapshot {
            rx_frames_total: 3,
            rx_short_reads: 1,
            ..Default::default()
        };
        assert!((snapshot.rx_health_rate() - 75.0).abs() < 1e-9);
        assert_eq!(MetricsSnapshot::default().rx_health_rate(), 0.0);
    }
}
