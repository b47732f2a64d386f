//! 测试程序字段
//!
//! 保存和加载由外部完成，这里只负责有序字段列表与序列参数之间的转换。

use crate::error::ClientError;
use crate::movement::Movement;
use crate::sequencer::SequenceParams;
use crate::speed::{SpeedControl, slider_for_speed};
use bench_protocol::Axis;
use tracing::debug;

/// 字段键，按保存顺序排列
pub const PROGRAM_KEYS: [&str; 8] = [
    "movement",
    "amplitude",
    "turns",
    "vertical_speed",
    "horizontal_speed",
    "adaptor_speed",
    "repetitions",
    "name",
];

/// 测试程序
///
/// 速度字段保存换算后的速度（线性轴 mm/s，转接头 圈/s），下发时反查滑块值。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestProgram {
    pub name: String,
    pub movement: Movement,
    /// 线性轴行程（mm）
    pub amplitude: u16,
    /// 转接头圈数
    pub turns: f64,
    pub vertical_speed: f64,
    pub horizontal_speed: f64,
    pub adaptor_speed: f64,
    pub repetitions: u32,
}

impl TestProgram {
    /// 以速度控制的当前缓存组成程序
    pub fn capture(name: impl Into<String>, params: &SequenceParams, speeds: &SpeedControl) -> Self {
        Self {
            name: name.into(),
            movement: params.movement,
            amplitude: params.amplitude_mm,
            turns: params.turns,
            vertical_speed: speeds.current(Axis::Vertical).speed,
            horizontal_speed: speeds.current(Axis::Horizontal).speed,
            adaptor_speed: speeds.current(Axis::Adaptor).speed,
            repetitions: params.repetitions,
        }
    }

    /// 按 [`PROGRAM_KEYS`] 顺序输出 `(键, 值)`
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("movement", self.movement.label().to_string()),
            ("amplitude", self.amplitude.to_string()),
            ("turns", self.turns.to_string()),
            ("vertical_speed", self.vertical_speed.to_string()),
            ("horizontal_speed", self.horizontal_speed.to_string()),
            ("adaptor_speed", self.adaptor_speed.to_string()),
            ("repetitions", self.repetitions.to_string()),
            ("name", self.name.clone()),
        ]
    }

    /// 从 `(键, 值)` 重建，未知键忽略，缺少任何键都报错
    pub fn from_fields<K, V>(fields: &[(K, V)]) -> Result<Self, ClientError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lookup = |key: &str| -> Result<&str, ClientError> {
            fields
                .iter()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v.as_ref().trim())
                .ok_or_else(|| ClientError::MissingField(key.to_string()))
        };

        Ok(Self {
            name: lookup("name")?.to_string(),
            movement: lookup("movement")?.parse()?,
            amplitude: parse_field("amplitude", lookup("amplitude")?)?,
            turns: parse_field("turns", lookup("turns")?)?,
            vertical_speed: parse_field("vertical_speed", lookup("vertical_speed")?)?,
            horizontal_speed: parse_field("horizontal_speed", lookup("horizontal_speed")?)?,
            adaptor_speed: parse_field("adaptor_speed", lookup("adaptor_speed")?)?,
            repetitions: parse_field("repetitions", lookup("repetitions")?)?,
        })
    }

    /// 序列参数
    pub fn to_params(&self) -> SequenceParams {
        SequenceParams {
            movement: self.movement,
            amplitude_mm: self.amplitude,
            turns: self.turns,
            repetitions: self.repetitions,
        }
    }

    pub fn speed_for(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.vertical_speed,
            Axis::Horizontal => self.horizontal_speed,
            Axis::Adaptor => self.adaptor_speed,
        }
    }

    /// 反查三个轴的滑块值并下发（只发送有变化的轴）
    ///
    /// 任一速度没有对应的滑块值时报错，此时不发送任何命令。
    pub fn apply_speeds(&self, control: &SpeedControl) -> Result<(), ClientError> {
        let sliders = Axis::ALL.map(|axis| {
            let speed = self.speed_for(axis);
            slider_for_speed(axis, speed).ok_or_else(|| ClientError::InvalidField {
                key: format!("{axis}_speed"),
                value: speed.to_string(),
            })
        });

        for (axis, slider) in Axis::ALL.into_iter().zip(sliders) {
            let slider = slider?;
            if control.set_slider(axis, f64::from(slider))?.is_some() {
                debug!("program {:?}: {} speed slider {}", self.name, axis, slider);
            }
        }
        Ok(())
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ClientError> {
    value.parse().map_err(|_| ClientError::InvalidField {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speed::SliderSpeed;
    use bench_driver::DeviceState;
    use bench_protocol::CommandFrame;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingIo {
        sent: Mutex<Vec<CommandFrame>>,
    }

    impl crate::io::BenchIo for RecordingIo {
        fn send(&self, frame: &CommandFrame) {
            self.sent.lock().push(*frame);
        }

        fn device_state(&self) -> DeviceState {
            DeviceState::default()
        }
    }

    fn sample() -> TestProgram {
        TestProgram {
            name: "fatigue-01".into(),
            movement: Movement::ScrewDownToScrewUp,
            amplitude: 120,
            turns: 3.5,
            vertical_speed: speed(Axis::Vertical, 20),
            horizontal_speed: speed(Axis::Horizontal, 80),
            adaptor_speed: speed(Axis::Adaptor, 10),
            repetitions: 25,
        }
    }

    fn speed(axis: Axis, slider: u8) -> f64 {
        SliderSpeed::new(axis, slider).unwrap().speed
    }

    #[test]
    fn test_field_order() {
        let keys: Vec<&str> = sample().fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, PROGRAM_KEYS);
    }

    #[test]
    fn test_fields_roundtrip_into_params() {
        let program = sample();
        let back = TestProgram::from_fields(&program.fields()).unwrap();
        assert_eq!(back, program);

        let params = back.to_params();
        assert_eq!(params.movement, Movement::ScrewDownToScrewUp);
        assert_eq!(params.target_data().unwrap(), 350);
        assert_eq!(params.repetitions, 25);
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let mut fields: Vec<(String, String)> = sample()
            .fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        fields.retain(|(k, _)| k != "turns");
        assert!(matches!(
            TestProgram::from_fields(&fields),
            Err(ClientError::MissingField(key)) if key == "turns"
        ));

        fields.push(("turns".into(), "lots".into()));
        assert!(matches!(
            TestProgram::from_fields(&fields),
            Err(ClientError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_placeholder_movement_rejected() {
        let mut fields = sample().fields();
        fields[0].1 = crate::movement::MOVEMENT_PLACEHOLDER.to_string();
        assert!(matches!(
            TestProgram::from_fields(&fields),
            Err(ClientError::MissingMovement)
        ));
    }

    #[test]
    fn test_low_end_speed_applies_first_matching_slider() {
        // 滑块 0 和 1 都换算为 12 mm/s
        assert_eq!(speed(Axis::Vertical, 0), speed(Axis::Vertical, 1));

        let io = Arc::new(RecordingIo::default());
        let control = SpeedControl::new(io.clone());
        control.set_slider(Axis::Vertical, 50.0).unwrap();

        let mut program = sample();
        program.vertical_speed = speed(Axis::Vertical, 1);
        program.apply_speeds(&control).unwrap();

        let current = control.current(Axis::Vertical);
        assert_eq!(current.slider, 0);
        assert_eq!(current.speed, program.vertical_speed);
        // 其他轴取第一个换算结果相同的滑块值
        let horizontal = slider_for_speed(Axis::Horizontal, program.horizontal_speed).unwrap();
        let adaptor = slider_for_speed(Axis::Adaptor, program.adaptor_speed).unwrap();
        let data: Vec<u16> = io.sent.lock().iter().map(|f| f.data).collect();
        assert_eq!(data, [50, 0, u16::from(horizontal), u16::from(adaptor)]);

        // 保存的速度经过字段文本后仍能反查
        let back = TestProgram::from_fields(&program.fields()).unwrap();
        assert_eq!(back.vertical_speed, program.vertical_speed);
        assert_eq!(slider_for_speed(Axis::Vertical, back.vertical_speed), Some(0));
    }

    #[test]
    fn test_unreachable_speed_sends_nothing() {
        let io = Arc::new(RecordingIo::default());
        let control = SpeedControl::new(io.clone());

        let mut program = sample();
        program.adaptor_speed = 0.37;
        assert!(matches!(
            program.apply_speeds(&control),
            Err(ClientError::InvalidField { key, value }) if key == "adaptor_speed" && value == "0.37"
        ));
        assert!(io.sent.lock().is_empty());
    }

    #[test]
    fn test_capture_reads_current_sliders() {
        let control = SpeedControl::new(Arc::new(RecordingIo::default()));
        control.set_slider(Axis::Horizontal, 100.0).unwrap();

        let params = sample().to_params();
        let program = TestProgram::capture("bench", &params, &control);
        assert_eq!(program.horizontal_speed, 40.0);
        assert_eq!(program.vertical_speed, speed(Axis::Vertical, 0));
        assert_eq!(program.to_params(), params);
    }
}
