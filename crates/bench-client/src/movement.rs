//! 运动方向与行程限制
//!
//! 每个运动方向解析为 `(电机 ID, 命令 A, 命令 B)`，自动序列在两条命令之间交替。

use crate::error::ClientError;
use bench_protocol::{Axis, Command, ComponentId, turns_to_data};

/// 下拉框占位文本，表示尚未选择方向
pub const MOVEMENT_PLACEHOLDER: &str = "Choose movement";

/// 运动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Movement {
    #[cfg_attr(feature = "serde", serde(rename = "Up to down"))]
    UpToDown,
    #[cfg_attr(feature = "serde", serde(rename = "Down to up"))]
    DownToUp,
    #[cfg_attr(feature = "serde", serde(rename = "Left to right"))]
    LeftToRight,
    #[cfg_attr(feature = "serde", serde(rename = "Right to left"))]
    RightToLeft,
    #[cfg_attr(feature = "serde", serde(rename = "Screw up to screw down"))]
    ScrewUpToScrewDown,
    #[cfg_attr(feature = "serde", serde(rename = "Screw down to screw up"))]
    ScrewDownToScrewUp,
}

impl Movement {
    pub const ALL: [Movement; 6] = [
        Movement::UpToDown,
        Movement::DownToUp,
        Movement::LeftToRight,
        Movement::RightToLeft,
        Movement::ScrewUpToScrewDown,
        Movement::ScrewDownToScrewUp,
    ];

    /// 界面显示的名称
    pub fn label(self) -> &'static str {
        match self {
            Movement::UpToDown => "Up to down",
            Movement::DownToUp => "Down to up",
            Movement::LeftToRight => "Left to right",
            Movement::RightToLeft => "Right to left",
            Movement::ScrewUpToScrewDown => "Screw up to screw down",
            Movement::ScrewDownToScrewUp => "Screw down to screw up",
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Movement::UpToDown | Movement::DownToUp => Axis::Vertical,
            Movement::LeftToRight | Movement::RightToLeft => Axis::Horizontal,
            Movement::ScrewUpToScrewDown | Movement::ScrewDownToScrewUp => Axis::Adaptor,
        }
    }

    /// 解析出电机 ID 和交替发送的两条命令
    pub fn resolve(self) -> Trajectory {
        let (command_a, command_b) = match self {
            Movement::UpToDown => (Command::VerticalUp, Command::VerticalDown),
            Movement::DownToUp => (Command::VerticalDown, Command::VerticalUp),
            Movement::LeftToRight => (Command::HorizontalLeft, Command::HorizontalRight),
            Movement::RightToLeft => (Command::HorizontalRight, Command::HorizontalLeft),
            Movement::ScrewUpToScrewDown => (Command::AdaptorUp, Command::AdaptorDown),
            Movement::ScrewDownToScrewUp => (Command::AdaptorDown, Command::AdaptorUp),
        };
        let axis = self.axis();
        Trajectory {
            axis,
            id: axis.motor_id(),
            command_a,
            command_b,
        }
    }

    /// 位置控制命令的负载：线性轴为行程（mm），转接头为圈数 ×100
    pub fn target_data(self, amplitude_mm: u16, turns: f64) -> Result<u16, ClientError> {
        if self.axis().is_rotary() {
            Ok(turns_to_data(turns)?)
        } else {
            Ok(amplitude_mm)
        }
    }
}

impl std::fmt::Display for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Movement {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == MOVEMENT_PLACEHOLDER {
            return Err(ClientError::MissingMovement);
        }
        Movement::ALL
            .into_iter()
            .find(|movement| movement.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClientError::UnknownMovement(s.to_string()))
    }
}

/// 解析后的轨迹参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trajectory {
    pub axis: Axis,
    pub id: ComponentId,
    /// 驶向检查点 A 的命令
    pub command_a: Command,
    /// 驶向检查点 B 的命令
    pub command_b: Command,
}

/// 各轴行程上限
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TravelLimits {
    pub vertical_mm: u16,
    pub horizontal_mm: u16,
    pub adaptor_turns: f64,
}

impl Default for TravelLimits {
    fn default() -> Self {
        Self {
            vertical_mm: 400,
            horizontal_mm: 400,
            adaptor_turns: 50.0,
        }
    }
}

impl TravelLimits {
    /// 该轴的上限（线性轴 mm，转接头 圈）
    pub fn max_for(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => f64::from(self.vertical_mm),
            Axis::Horizontal => f64::from(self.horizontal_mm),
            Axis::Adaptor => self.adaptor_turns,
        }
    }

    /// 在发送任何帧之前校验请求的行程
    ///
    /// 线性运动校验行程，转接头运动校验圈数。
    pub fn validate(&self, movement: Movement, amplitude_mm: u16, turns: f64) -> Result<(), ClientError> {
        let axis = movement.axis();
        let value = if axis.is_rotary() {
            turns
        } else {
            f64::from(amplitude_mm)
        };
        let max = self.max_for(axis);

        if !value.is_finite() || value < 0.0 || value > max {
            return Err(ClientError::ExceedsMaximum { axis, value, max });
        }
        Ok(())
    }
}
