//! 状态帧解析（控制器 → 主机）
//!
//! 控制器固件存在两种状态帧：
//!
//! - 紧凑帧（4 字节）：`id | movement_status | data`，电机状态取 data 的低字节，不携带位置
//! - 扩展帧（8 字节）：第一个字为 `id | movement_status | motor_state | reserved`，
//!   第二个字为有符号 32 位绝对位置

use crate::constants::{COMPACT_STATUS_FRAME_LEN, EXTENDED_STATUS_FRAME_LEN};
use crate::{ComponentId, ProtocolError, bytes_to_i32_le, bytes_to_u32_le, word_at};
use bilge::prelude::*;

/// 电机运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MotorState {
    #[default]
    Idle,
    Jogging,
    InTrajectory,
    EndOfTrajectory,
    ChangingParameters,
    Fault,
    /// 固件上报了未定义的状态值
    Unknown(u8),
}

impl From<u8> for MotorState {
    fn from(value: u8) -> Self {
        match value {
            0 => MotorState::Idle,
            1 => MotorState::Jogging,
            2 => MotorState::InTrajectory,
            3 => MotorState::EndOfTrajectory,
            4 => MotorState::ChangingParameters,
            5 => MotorState::Fault,
            other => MotorState::Unknown(other),
        }
    }
}

impl From<MotorState> for u8 {
    fn from(state: MotorState) -> Self {
        match state {
            MotorState::Idle => 0,
            MotorState::Jogging => 1,
            MotorState::InTrajectory => 2,
            MotorState::EndOfTrajectory => 3,
            MotorState::ChangingParameters => 4,
            MotorState::Fault => 5,
            MotorState::Unknown(other) => other,
        }
    }
}

// ============================================================================
// 位域定义
// ============================================================================

/// 扩展状态帧第一个字
#[bitsize(32)]
#[derive(FromBits, DebugBits, Clone, Copy)]
pub struct StatusWord {
    pub reserved: u8,        // Bit 0-7
    pub motor_state: u8,     // Bit 8-15
    pub movement_status: u8, // Bit 16-23
    pub id: u8,              // Bit 24-31
}

/// 紧凑状态帧
#[bitsize(32)]
#[derive(FromBits, DebugBits, Clone, Copy)]
pub struct CompactStatusWord {
    pub data: u16,           // Bit 0-15
    pub movement_status: u8, // Bit 16-23
    pub id: u8,              // Bit 24-31
}

/// 状态帧变体（由固件版本决定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FrameVariant {
    /// 单字帧
    Compact,
    /// 双字帧（带绝对位置）
    #[default]
    Extended,
}

impl FrameVariant {
    /// 该变体的帧长度（字节）
    pub fn len(self) -> usize {
        match self {
            FrameVariant::Compact => COMPACT_STATUS_FRAME_LEN,
            FrameVariant::Extended => EXTENDED_STATUS_FRAME_LEN,
        }
    }
}

impl std::str::FromStr for FrameVariant {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "4" => Ok(FrameVariant::Compact),
            "extended" | "8" => Ok(FrameVariant::Extended),
            _ => Err(ProtocolError::UnknownName {
                field: "frame variant",
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for FrameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameVariant::Compact => f.write_str("compact"),
            FrameVariant::Extended => f.write_str("extended"),
        }
    }
}

/// 解析后的状态帧
///
/// 紧凑帧不携带位置，`position` 为 `None`，由设备状态保留上一次的值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    pub id: u8,
    pub movement_status: u8,
    pub motor_state: MotorState,
    pub position: Option<i32>,
}

impl StatusFrame {
    /// 按长度自动识别变体并解析
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        match bytes.len() {
            COMPACT_STATUS_FRAME_LEN => Ok(Self::parse_compact(bytes_to_u32_le(word_at(bytes, 0)))),
            EXTENDED_STATUS_FRAME_LEN => Ok(Self::parse_extended(
                bytes_to_u32_le(word_at(bytes, 0)),
                bytes_to_i32_le(word_at(bytes, 1)),
            )),
            actual => Err(ProtocolError::InvalidLength {
                expected: EXTENDED_STATUS_FRAME_LEN,
                actual,
            }),
        }
    }

    fn parse_compact(word: u32) -> Self {
        let word = CompactStatusWord::from(word);
        Self {
            id: word.id(),
            movement_status: word.movement_status(),
            motor_state: MotorState::from((word.data() & 0xFF) as u8),
            position: None,
        }
    }

    fn parse_extended(word: u32, position: i32) -> Self {
        let word = StatusWord::from(word);
        Self {
            id: word.id(),
            movement_status: word.movement_status(),
            motor_state: MotorState::from(word.motor_state()),
            position: Some(position),
        }
    }

    /// 部件编号与电机状态都是已定义的值
    ///
    /// 读取错位时拼出的帧通常不满足，读线程据此重新对齐。
    pub fn is_well_formed(&self) -> bool {
        ComponentId::from_u8(self.id).is_ok() && !matches!(self.motor_state, MotorState::Unknown(_))
    }

    /// 序列化（模拟设备和测试使用）
    pub fn to_bytes(&self, variant: FrameVariant) -> Vec<u8> {
        match variant {
            FrameVariant::Compact => {
                let word = CompactStatusWord::new(
                    u16::from(u8::from(self.motor_state)),
                    self.movement_status,
                    self.id,
                );
                u32::from(word).to_le_bytes().to_vec()
            },
            FrameVariant::Extended => {
                // reserved 字段不在 new() 参数中，自动填 0
                let word = StatusWord::new(u8::from(self.motor_state), self.movement_status, self.id);
                let mut bytes = u32::from(word).to_le_bytes().to_vec();
                bytes.extend_from_slice(&self.position.unwrap_or_default().to_le_bytes());
                bytes
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_state_from_u8() {
        assert_eq!(MotorState::from(2), MotorState::InTrajectory);
        assert_eq!(MotorState::from(3), MotorState::EndOfTrajectory);
        assert_eq!(MotorState::from(5), MotorState::Fault);
        assert_eq!(MotorState::from(0x42), MotorState::Unknown(0x42));
        assert_eq!(u8::from(MotorState::Unknown(0x42)), 0x42);
    }

    #[test]
    fn test_parse_extended_frame() {
        // id=4, movement=1, motor=InTrajectory, position=-1200
        let mut bytes = vec![0x00, 0x02, 0x01, 0x04];
        bytes.extend_from_slice(&(-1200i32).to_le_bytes());

        let frame = StatusFrame::parse(&bytes).unwrap();
        assert_eq!(frame.id, 4);
        assert_eq!(frame.movement_status, 1);
        assert_eq!(frame.motor_state, MotorState::InTrajectory);
        assert_eq!(frame.position, Some(-1200));
    }

    #[test]
    fn test_parse_compact_frame_has_no_position() {
        let bytes = [0x03, 0x00, 0x07, 0x06];
        let frame = StatusFrame::parse(&bytes).unwrap();
        assert_eq!(frame.id, 6);
        assert_eq!(frame.movement_status, 7);
        assert_eq!(frame.motor_state, MotorState::EndOfTrajectory);
        assert_eq!(frame.position, None);
    }

    #[test]
    fn test_parse_rejects_other_lengths() {
        for len in [0usize, 3, 5, 7, 9] {
            let bytes = vec![0u8; len];
            assert!(matches!(
                StatusFrame::parse(&bytes),
                Err(ProtocolError::InvalidLength { actual, .. }) if actual == len
            ));
        }
    }

    #[test]
    fn test_to_bytes_matches_parse() {
        let frame = StatusFrame {
            id: 7,
            movement_status: 2,
            motor_state: MotorState::Jogging,
            position: Some(12345),
        };
        let parsed = StatusFrame::parse(&frame.to_bytes(FrameVariant::Extended)).unwrap();
        assert_eq!(parsed, frame);

        let bytes = frame.to_bytes(FrameVariant::Extended);
        assert_eq!(&bytes[..4], &[0x00, 0x01, 0x02, 0x07]);

        let compact = StatusFrame::parse(&frame.to_bytes(FrameVariant::Compact)).unwrap();
        assert_eq!(compact.motor_state, MotorState::Jogging);
        assert_eq!(compact.position, None);
    }

    #[test]
    fn test_well_formed_rejects_misaligned_bytes() {
        let frame = StatusFrame::parse(&[0x00, 0x03, 0x00, 0x04, 0, 0, 0, 0]).unwrap();
        assert!(frame.is_well_formed());

        // 5 字节残尾 + 下一帧的前 3 字节
        let misaligned = StatusFrame::parse(&[0xAB, 0xCD, 0xEF, 0x99, 0x77, 0x00, 0x03, 0x00]).unwrap();
        assert!(!misaligned.is_well_formed());

        let unknown_state = StatusFrame::parse(&[0x42, 0x00, 0x00, 0x04]).unwrap();
        assert!(!unknown_state.is_well_formed());
    }

    #[test]
    fn test_frame_variant_len_and_parse() {
        assert_eq!(FrameVariant::Compact.len(), 4);
        assert_eq!(FrameVariant::Extended.len(), 8);
        assert_eq!("compact".parse::<FrameVariant>().unwrap(), FrameVariant::Compact);
        assert_eq!("8".parse::<FrameVariant>().unwrap(), FrameVariant::Extended);
        assert_eq!(
            "wide".parse::<FrameVariant>().unwrap_err(),
            ProtocolError::UnknownName {
                field: "frame variant",
                name: "wide".to_string()
            }
        );
        assert!("huge".parse::<FrameVariant>().is_err());
    }
}
