//! 链路状态
//!
//! `Disconnected → Connecting → Connected → Disconnected`（出错或主动关闭）。

use std::sync::atomic::{AtomicU8, Ordering};

/// 链路状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LinkStatus {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl LinkStatus {
    /// 从 u8 转换，无效值视为 Disconnected
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkStatus::Disconnected => "disconnected",
            LinkStatus::Connecting => "connecting",
            LinkStatus::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// 链路状态（原子版本，读线程和调用方共享）
#[derive(Debug)]
pub struct AtomicLinkStatus {
    inner: AtomicU8,
}

impl AtomicLinkStatus {
    pub fn new(status: LinkStatus) -> Self {
        Self {
            inner: AtomicU8::new(status.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> LinkStatus {
        LinkStatus::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, status: LinkStatus, ordering: Ordering) {
        self.inner.store(status.as_u8(), ordering);
    }

    /// 比较并交换，成功返回 true
    pub fn compare_exchange(
        &self,
        current: LinkStatus,
        new: LinkStatus,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        self.inner
            .compare_exchange(current.as_u8(), new.as_u8(), success, failure)
            .is_ok()
    }
}

impl Default for AtomicLinkStatus {
    fn default() -> Self {
        Self::new(LinkStatus::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        assert_eq!(LinkStatus::from_u8(0), LinkStatus::Disconnected);
        assert_eq!(LinkStatus::from_u8(1), LinkStatus::Connecting);
        assert_eq!(LinkStatus::from_u8(2), LinkStatus::Connected);
        assert_eq!(LinkStatus::from_u8(200), LinkStatus::Disconnected);
    }

    #[test]
    fn test_atomic_transitions() {
        let status = AtomicLinkStatus::default();
        assert_eq!(status.get(Ordering::Relaxed), LinkStatus::Disconnected);

        status.set(LinkStatus::Connecting, Ordering::Relaxed);
        assert!(status.compare_exchange(
            LinkStatus::Connecting,
            LinkStatus::Connected,
            Ordering::AcqRel,
            Ordering::Acquire
        ));
        assert!(status.get(Ordering::Acquire).is_connected());

        // 期望值不匹配
        assert!(!status.compare_exchange(
            LinkStatus::Connecting,
            LinkStatus::Disconnected,
            Ordering::AcqRel,
            Ordering::Acquire
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(LinkStatus::Connected.to_string(), "connected");
    }
}
