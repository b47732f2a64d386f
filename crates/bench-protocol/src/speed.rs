//! 速度换算
//!
//! 控制器用定时器自动重装值（ARR）控制步进脉冲频率，滑块值 `v` 每增加 1，
//! ARR 减少 `INCREMENT`。物理速度由脉冲频率推出：
//!
//! ```text
//! denominator             = (ARR_MIN - INCREMENT * v + 1) * (PRESCALER + 1)
//! linear_speed_mm_per_s   = floor((CLOCK_HZ / denominator) * (1 / PULSES_PER_MM))
//! rotary_speed_turn_per_s = floor(CLOCK_HZ / denominator) * (2 / PULSES_PER_TURN) / GEARBOX_RATIO
//! ```
//!
//! 测试程序保存的是换算后的速度，所以取整位置和运算顺序必须保持不变。

use crate::constants::TURNS_SCALE;
use crate::ids::Axis;
use crate::ProtocolError;

/// 定时器时钟频率（Hz）
pub const CLOCK_HZ: f64 = 72_000_000.0;
/// 定时器预分频
pub const PRESCALER: u32 = 10;
/// ARR 最小增量基准
pub const ARR_MIN: u32 = 6500;
/// 滑块每一档对应的 ARR 减量
pub const INCREMENT: u32 = 45;
/// 线性轴每毫米脉冲数
pub const PULSES_PER_MM: f64 = 80.0;
/// 转接头每圈脉冲数
pub const PULSES_PER_TURN: f64 = 400.0;
/// 转接头减速比
pub const GEARBOX_RATIO: f64 = 10.0;

/// 线性轴滑块上限
pub const LINEAR_SLIDER_MAX: u8 = 100;
/// 旋转轴滑块上限
pub const ROTARY_SLIDER_MAX: u8 = 50;

/// 该轴的滑块上限
pub fn slider_max(axis: Axis) -> u8 {
    if axis.is_rotary() {
        ROTARY_SLIDER_MAX
    } else {
        LINEAR_SLIDER_MAX
    }
}

fn check_slider(value: u8, max: u8) -> Result<(), ProtocolError> {
    if value > max {
        return Err(ProtocolError::OutOfRange {
            field: "slider".to_string(),
            value: f64::from(value),
            max: f64::from(max),
        });
    }
    Ok(())
}

/// 定时器分母 `(ARR_MIN - INCREMENT * v + 1) * (PRESCALER + 1)`
///
/// 只在 `check_slider` 之后调用：`v <= LINEAR_SLIDER_MAX` 时结果恒为正。
fn timer_denominator(value: u8) -> u32 {
    (ARR_MIN - INCREMENT * u32::from(value) + 1) * (PRESCALER + 1)
}

/// 未取整的步进脉冲频率（Hz），随滑块值严格递增
pub fn step_frequency_hz(value: u8) -> Result<f64, ProtocolError> {
    check_slider(value, LINEAR_SLIDER_MAX)?;
    Ok(CLOCK_HZ / f64::from(timer_denominator(value)))
}

/// 线性轴速度（mm/s），向下取整
pub fn linear_speed_mm_per_s(value: u8) -> Result<f64, ProtocolError> {
    check_slider(value, LINEAR_SLIDER_MAX)?;
    let denominator = f64::from(timer_denominator(value));
    Ok(((CLOCK_HZ / denominator) * (1.0 / PULSES_PER_MM)).floor())
}

/// 转接头速度（圈/s）
pub fn rotary_speed_turn_per_s(value: u8) -> Result<f64, ProtocolError> {
    check_slider(value, ROTARY_SLIDER_MAX)?;
    let denominator = f64::from(timer_denominator(value));
    Ok((CLOCK_HZ / denominator).floor() * (2.0 / PULSES_PER_TURN) / GEARBOX_RATIO)
}

/// 按轴换算速度（线性轴 mm/s，转接头 圈/s）
pub fn axis_speed(axis: Axis, value: u8) -> Result<f64, ProtocolError> {
    if axis.is_rotary() {
        rotary_speed_turn_per_s(value)
    } else {
        linear_speed_mm_per_s(value)
    }
}

/// 圈数转换为传输数据（×100 后截断，保留两位小数）
pub fn turns_to_data(turns: f64) -> Result<u16, ProtocolError> {
    let scaled = turns * TURNS_SCALE;
    if !scaled.is_finite() || scaled < 0.0 || scaled > f64::from(u16::MAX) {
        return Err(ProtocolError::OutOfRange {
            field: "turns".to_string(),
            value: turns,
            max: f64::from(u16::MAX) / TURNS_SCALE,
        });
    }
    Ok(scaled.trunc() as u16)
}

/// 传输数据还原为圈数
pub fn data_to_turns(data: u16) -> f64 {
    f64::from(data) / TURNS_SCALE
}
