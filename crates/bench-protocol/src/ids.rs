//! 组件 ID、工作模式与命令码定义
//!
//! 数值必须与控制器固件保持一致。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 测试台组件 ID（命令字 Bit 24-31）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ComponentId {
    /// 保留
    #[default]
    Reserved = 0,
    /// 垂直左编码器
    EncoderVerticalLeft = 1,
    /// 垂直右编码器
    EncoderVerticalRight = 2,
    /// 水平编码器
    EncoderHorizontal = 3,
    /// 垂直左电机
    MotorVerticalLeft = 4,
    /// 垂直右电机
    MotorVerticalRight = 5,
    /// 水平电机
    MotorHorizontal = 6,
    /// 转接头（旋转）电机
    MotorAdaptor = 7,
}

impl ComponentId {
    /// 从原始字节解析
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Self::try_from(value).map_err(|e| ProtocolError::InvalidValue {
            field: "ComponentId".to_string(),
            value: u32::from(e.number),
        })
    }

    /// 该组件所属的运动轴（编码器和保留 ID 返回 `None`）
    pub fn axis(self) -> Option<Axis> {
        match self {
            ComponentId::MotorVerticalLeft | ComponentId::MotorVerticalRight => {
                Some(Axis::Vertical)
            },
            ComponentId::MotorHorizontal => Some(Axis::Horizontal),
            ComponentId::MotorAdaptor => Some(Axis::Adaptor),
            _ => None,
        }
    }
}

/// 工作模式（命令字 Bit 21-23，3 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Mode {
    /// 无模式
    #[default]
    None = 0,
    /// 手动点动
    Manual = 1,
    /// 位置控制（自动模式）
    PositionControl = 2,
    /// 复位
    Reset = 3,
    /// 修改参数（速度等）
    ChangeParameters = 4,
}

impl Mode {
    /// 从原始值解析
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Self::try_from(value).map_err(|e| ProtocolError::InvalidValue {
            field: "Mode".to_string(),
            value: u32::from(e.number),
        })
    }
}

/// 命令码（命令字 Bit 16-20，5 位）
///
/// 命令码的含义取决于所寻址的组件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Command {
    #[default]
    Reserved = 0,
    VerticalUp = 1,
    VerticalDown = 2,
    VerticalStop = 3,
    HorizontalRight = 4,
    HorizontalLeft = 5,
    ChangeSpeed = 6,
    ReadEncoderVerticalLeft = 7,
    ReadEncoderVerticalRight = 8,
    ReadEncoderHorizontal = 9,
    EnableManualMode = 10,
    EnableAutomaticMode = 11,
    HorizontalStop = 12,
    AdaptorUp = 13,
    AdaptorDown = 14,
    AdaptorStop = 15,
}

impl Command {
    /// 从原始值解析
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Self::try_from(value).map_err(|e| ProtocolError::InvalidValue {
            field: "Command".to_string(),
            value: u32::from(e.number),
        })
    }

    /// 是否为停止命令
    pub fn is_stop(self) -> bool {
        matches!(
            self,
            Command::VerticalStop | Command::HorizontalStop | Command::AdaptorStop
        )
    }
}

/// 运动轴
///
/// 一次只点动一个轴；每个轴有自己的电机 ID、停止命令、速度滑块量程和行程上限。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// 垂直轴（线性，mm）
    Vertical,
    /// 水平轴（线性，mm）
    Horizontal,
    /// 转接头（旋转，圈）
    Adaptor,
}

impl Axis {
    /// 所有轴
    pub const ALL: [Axis; 3] = [Axis::Vertical, Axis::Horizontal, Axis::Adaptor];

    /// 该轴寻址的电机
    pub fn motor_id(self) -> ComponentId {
        match self {
            Axis::Vertical => ComponentId::MotorVerticalLeft,
            Axis::Horizontal => ComponentId::MotorHorizontal,
            Axis::Adaptor => ComponentId::MotorAdaptor,
        }
    }

    /// 该轴的停止命令
    pub fn stop_command(self) -> Command {
        match self {
            Axis::Vertical => Command::VerticalStop,
            Axis::Horizontal => Command::HorizontalStop,
            Axis::Adaptor => Command::AdaptorStop,
        }
    }

    /// 是否为旋转轴
    pub fn is_rotary(self) -> bool {
        self == Axis::Adaptor
    }

    /// 名称（小写，用于日志和命令行）
    pub fn name(self) -> &'static str {
        match self {
            Axis::Vertical => "vertical",
            Axis::Horizontal => "horizontal",
            Axis::Adaptor => "adaptor",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Axis {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertical" | "v" => Ok(Axis::Vertical),
            "horizontal" | "h" => Ok(Axis::Horizontal),
            "adaptor" | "adapter" | "a" => Ok(Axis::Adaptor),
            _ => Err(ProtocolError::UnknownName {
                field: "axis",
                name: s.to_string(),
            }),
        }
    }
}
