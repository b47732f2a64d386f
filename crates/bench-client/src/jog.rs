//! 手动点动
//!
//! 按下按键发送手动模式命令并记录最后动作的轴；松开时只向这个轴发送停止命令。
//! 松开事件本身不携带轴信息。

use crate::error::ClientError;
use crate::io::BenchIo;
use bench_protocol::{Axis, Command, CommandFrame};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// 点动按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JogKey {
    /// `w`
    Up,
    /// `s`
    Down,
    /// `a`
    Left,
    /// `d`
    Right,
    /// `e`
    AdaptorUp,
    /// `q`
    AdaptorDown,
}

impl JogKey {
    pub const ALL: [JogKey; 6] = [
        JogKey::Up,
        JogKey::Down,
        JogKey::Left,
        JogKey::Right,
        JogKey::AdaptorUp,
        JogKey::AdaptorDown,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'w' => Some(JogKey::Up),
            's' => Some(JogKey::Down),
            'a' => Some(JogKey::Left),
            'd' => Some(JogKey::Right),
            'e' => Some(JogKey::AdaptorUp),
            'q' => Some(JogKey::AdaptorDown),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            JogKey::Up => 'w',
            JogKey::Down => 's',
            JogKey::Left => 'a',
            JogKey::Right => 'd',
            JogKey::AdaptorUp => 'e',
            JogKey::AdaptorDown => 'q',
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            JogKey::Up | JogKey::Down => Axis::Vertical,
            JogKey::Left | JogKey::Right => Axis::Horizontal,
            JogKey::AdaptorUp | JogKey::AdaptorDown => Axis::Adaptor,
        }
    }

    pub fn command(self) -> Command {
        match self {
            JogKey::Up => Command::VerticalUp,
            JogKey::Down => Command::VerticalDown,
            JogKey::Left => Command::HorizontalLeft,
            JogKey::Right => Command::HorizontalRight,
            JogKey::AdaptorUp => Command::AdaptorUp,
            JogKey::AdaptorDown => Command::AdaptorDown,
        }
    }
}

impl std::str::FromStr for JogKey {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => JogKey::from_char(c).ok_or(ClientError::UnknownJogKey(c)),
            _ => Err(ClientError::UnknownJogKey(s.chars().next().unwrap_or(' '))),
        }
    }
}

/// 点动高亮显示接口，`None` 表示清除高亮
pub trait JogIndicator: Send + Sync {
    fn highlight(&self, key: Option<JogKey>);
}

/// 手动点动控制器
pub struct JogController {
    io: Arc<dyn BenchIo>,
    last_active: Mutex<Option<Axis>>,
    indicator: Option<Arc<dyn JogIndicator>>,
}

impl JogController {
    pub fn new(io: Arc<dyn BenchIo>) -> Self {
        Self {
            io,
            last_active: Mutex::new(None),
            indicator: None,
        }
    }

    pub fn with_indicator(mut self, indicator: Arc<dyn JogIndicator>) -> Self {
        self.indicator = Some(indicator);
        self
    }

    /// 按下：发送无负载的手动模式命令
    pub fn key_down(&self, key: JogKey) {
        let axis = key.axis();
        debug!("jog {:?} on {} axis", key, axis);
        self.io.send(&CommandFrame::manual(axis.motor_id(), key.command()));
        *self.last_active.lock() = Some(axis);

        if let Some(indicator) = &self.indicator {
            indicator.highlight(Some(key));
        }
    }

    /// 按字符按下，未映射的字符返回 false 且不发送
    pub fn key_down_char(&self, c: char) -> bool {
        match JogKey::from_char(c) {
            Some(key) => {
                self.key_down(key);
                true
            },
            None => false,
        }
    }

    /// 松开：只向最后动作的轴发送停止命令，然后清除高亮
    ///
    /// 返回被停止的轴；之前没有按下过任何按键时不发送。
    pub fn key_up(&self) -> Option<Axis> {
        let axis = self.last_active.lock().take();

        if let Some(axis) = axis {
            debug!("stop {} axis", axis);
            self.io
                .send(&CommandFrame::manual(axis.motor_id(), axis.stop_command()));
        }

        if let Some(indicator) = &self.indicator {
            indicator.highlight(None);
        }
        axis
    }

    /// 最后动作的轴
    pub fn last_active(&self) -> Option<Axis> {
        *self.last_active.lock()
    }
}
