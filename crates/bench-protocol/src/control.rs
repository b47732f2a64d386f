//! 命令帧编解码
//!
//! 主机发往控制器的命令是一个 32 位字，小端序列化为 4 字节。
//!
//! # 位域布局（LSB first）
//!
//! ```text
//!  31        24 23   21 20     16 15                0
//! +------------+-------+---------+-------------------+
//! |     id     | mode  | command |       data        |
//! |   8 bits   | 3 bits| 5 bits  |      16 bits      |
//! +------------+-------+---------+-------------------+
//! ```
//!
//! mode 与 command 共享 id 字节与 data 字段之间的 8 位，互不重叠。
//! `Mode::ChangeParameters = 4` 需要 3 位，因此 mode 占 3 位、command 占 5 位。

use crate::constants::{COMMAND_FRAME_LEN, COMMAND_MAX, DATA_NONE, MODE_MAX};
use crate::ids::{Command, ComponentId, Mode};
use crate::{ProtocolError, bytes_to_u32_le, u32_to_bytes_le, word_at};
use bilge::prelude::*;

/// 命令字位域
#[bitsize(32)]
#[derive(FromBits, DebugBits, Clone, Copy)]
pub struct CommandWord {
    pub data: u16,   // Bit 0-15: 负载
    pub command: u5, // Bit 16-20: 命令码
    pub mode: u3,    // Bit 21-23: 工作模式
    pub id: u8,      // Bit 24-31: 组件 ID
}

/// 将原始字段打包为命令字
///
/// mode 超过 3 位或 command 超过 5 位时返回错误，而不是让字段互相覆盖。
pub fn encode(id: u8, mode: u8, command: u8, data: u16) -> Result<u32, ProtocolError> {
    if mode > MODE_MAX {
        return Err(ProtocolError::InvalidValue {
            field: "mode".to_string(),
            value: u32::from(mode),
        });
    }
    if command > COMMAND_MAX {
        return Err(ProtocolError::InvalidValue {
            field: "command".to_string(),
            value: u32::from(command),
        });
    }

    let word = CommandWord::new(data, u5::new(command), u3::new(mode), id);
    Ok(u32::from(word))
}

/// 将命令字拆分为 `(id, mode, command, data)`，是 [`encode`] 的逆操作
pub fn decode(word: u32) -> (u8, u8, u8, u16) {
    let word = CommandWord::from(word);
    (
        word.id(),
        word.mode().value(),
        word.command().value(),
        word.data(),
    )
}

/// 命令帧（强类型）
///
/// 每次发送时构建、发送后丢弃，不做持久化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandFrame {
    pub id: ComponentId,
    pub mode: Mode,
    pub command: Command,
    pub data: u16,
}

impl CommandFrame {
    /// 创建完整的命令帧
    pub fn new(id: ComponentId, mode: Mode, command: Command, data: u16) -> Self {
        Self {
            id,
            mode,
            command,
            data,
        }
    }

    /// 手动点动命令（无负载）
    pub fn manual(id: ComponentId, command: Command) -> Self {
        Self::new(id, Mode::Manual, command, DATA_NONE)
    }

    /// 位置控制命令
    ///
    /// `data` 为目标位置（mm），转接头为圈数 ×100。
    pub fn position(id: ComponentId, command: Command, data: u16) -> Self {
        Self::new(id, Mode::PositionControl, command, data)
    }

    /// 修改速度命令，`data` 为滑块值
    pub fn change_speed(id: ComponentId, slider_value: u8) -> Self {
        Self::new(
            id,
            Mode::ChangeParameters,
            Command::ChangeSpeed,
            u16::from(slider_value),
        )
    }

    /// 打包为命令字
    pub fn to_word(self) -> u32 {
        // 枚举取值均在字段位宽之内
        let word = CommandWord::new(
            self.data,
            u5::new(u8::from(self.command)),
            u3::new(u8::from(self.mode)),
            u8::from(self.id),
        );
        u32::from(word)
    }

    /// 序列化为线上字节（小端）
    pub fn to_bytes(self) -> [u8; COMMAND_FRAME_LEN] {
        u32_to_bytes_le(self.to_word())
    }

    /// 从命令字解析
    pub fn from_word(word: u32) -> Result<Self, ProtocolError> {
        let (id, mode, command, data) = decode(word);
        Ok(Self {
            id: ComponentId::from_u8(id)?,
            mode: Mode::from_u8(mode)?,
            command: Command::from_u8(command)?,
            data,
        })
    }

    /// 从线上字节解析
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != COMMAND_FRAME_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: COMMAND_FRAME_LEN,
                actual: bytes.len(),
            });
        }
        Self::from_word(bytes_to_u32_le(word_at(bytes, 0)))
    }
}
