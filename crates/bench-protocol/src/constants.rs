//! 协议常量定义

/// 串口波特率
pub const BAUD_RATE: u32 = 115_200;

/// 命令帧长度（主机 → 控制器，一个 32 位字）
pub const COMMAND_FRAME_LEN: usize = 4;

/// 紧凑状态帧长度（单字：id / 运动状态 / 数据）
pub const COMPACT_STATUS_FRAME_LEN: usize = 4;

/// 扩展状态帧长度（两个字：id / 运动状态 / 电机状态 + 绝对位置）
pub const EXTENDED_STATUS_FRAME_LEN: usize = 8;

/// 无负载
pub const DATA_NONE: u16 = 0;

/// 圈数传输放大倍数（保留两位小数）
pub const TURNS_SCALE: f64 = 100.0;

// ============================================================================
// 命令字位域布局（LSB first）
// ============================================================================

/// data 字段位宽（Bit 0-15）
pub const DATA_BITS: u32 = 16;

/// command 字段位宽（Bit 16-20）
pub const COMMAND_BITS: u32 = 5;

/// mode 字段位宽（Bit 21-23）
pub const MODE_BITS: u32 = 3;

/// command 字段最大值
pub const COMMAND_MAX: u8 = (1 << COMMAND_BITS) - 1;

/// mode 字段最大值
pub const MODE_MAX: u8 = (1 << MODE_BITS) - 1;
