//! 速度滑块
//!
//! 每个轴缓存 `(滑块值, 换算速度)`。滑块取整后的值发生变化时才发送修改速度命令，
//! 然后刷新缓存和显示。

use crate::error::ClientError;
use crate::io::BenchIo;
use bench_protocol::{Axis, CommandFrame, axis_speed, slider_max};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// 滑块值与换算速度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpeed {
    pub slider: u8,
    /// 线性轴 mm/s，转接头 圈/s（保留两位小数）
    pub speed: f64,
}

impl SliderSpeed {
    /// 换算滑块值
    pub fn new(axis: Axis, slider: u8) -> Result<Self, ClientError> {
        let speed = axis_speed(axis, slider)?;
        let speed = if axis.is_rotary() {
            round_two_decimals(speed)
        } else {
            speed
        };
        Ok(Self { slider, speed })
    }

    /// 显示文本，例如 `12 mm/s` 或 `0.50 turn/s`
    pub fn display_text(&self, axis: Axis) -> String {
        if axis.is_rotary() {
            format!("{:.2} turn/s", self.speed)
        } else {
            format!("{} mm/s", self.speed)
        }
    }
}

fn round_two_decimals(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

/// 由保存的速度反查滑块值（取第一个换算结果相同的滑块值）
pub fn slider_for_speed(axis: Axis, speed: f64) -> Option<u8> {
    (0..=slider_max(axis)).find(|&value| {
        SliderSpeed::new(axis, value)
            .map(|pair| (pair.speed - speed).abs() < 1e-9)
            .unwrap_or(false)
    })
}

/// 速度显示接口
pub trait SpeedDisplay: Send + Sync {
    fn show_speed(&self, axis: Axis, text: &str);
}

/// 三个轴的速度滑块
pub struct SpeedControl {
    io: Arc<dyn BenchIo>,
    sliders: Mutex<[SliderSpeed; 3]>,
    display: Option<Arc<dyn SpeedDisplay>>,
}

fn slot(axis: Axis) -> usize {
    match axis {
        Axis::Vertical => 0,
        Axis::Horizontal => 1,
        Axis::Adaptor => 2,
    }
}

impl SpeedControl {
    pub fn new(io: Arc<dyn BenchIo>) -> Self {
        let initial = Axis::ALL.map(|axis| {
            SliderSpeed::new(axis, 0).unwrap_or(SliderSpeed {
                slider: 0,
                speed: 0.0,
            })
        });
        Self {
            io,
            sliders: Mutex::new(initial),
            display: None,
        }
    }

    pub fn with_display(mut self, display: Arc<dyn SpeedDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    /// 当前缓存
    pub fn current(&self, axis: Axis) -> SliderSpeed {
        self.sliders.lock()[slot(axis)]
    }

    /// 滑块回调
    ///
    /// 返回 `Some(新值)` 表示已发送修改速度命令；取整后未变化或没有连接时返回 `None`。
    pub fn set_slider(&self, axis: Axis, raw: f64) -> Result<Option<SliderSpeed>, ClientError> {
        if !self.io.is_connected() {
            warn!("Could not send data: no device connected, {} speed unchanged", axis);
            return Ok(None);
        }

        let max = slider_max(axis);
        let rounded = raw.round();
        if !rounded.is_finite() || rounded < 0.0 || rounded > f64::from(max) {
            return Err(bench_protocol::ProtocolError::OutOfRange {
                field: format!("{axis} slider"),
                value: raw,
                max: f64::from(max),
            }
            .into());
        }
        let value = rounded as u8;

        let mut sliders = self.sliders.lock();
        if sliders[slot(axis)].slider == value {
            return Ok(None);
        }

        let pair = SliderSpeed::new(axis, value)?;
        self.io.send(&CommandFrame::change_speed(axis.motor_id(), value));
        sliders[slot(axis)] = pair;
        drop(sliders);

        debug!("{} speed slider -> {} ({})", axis, value, pair.display_text(axis));
        if let Some(display) = &self.display {
            display.show_speed(axis, &pair.display_text(axis));
        }
        Ok(Some(pair))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_driver::DeviceState;
    use bench_protocol::{ComponentId, Mode};

    #[derive(Default)]
    struct RecordingIo {
        sent: Mutex<Vec<CommandFrame>>,
    }

    impl BenchIo for RecordingIo {
        fn send(&self, frame: &CommandFrame) {
            self.sent.lock().push(*frame);
        }

        fn device_state(&self) -> DeviceState {
            DeviceState::default()
        }
    }

    #[derive(Default)]
    struct TextSink {
        lines: Mutex<Vec<String>>,
    }

    impl SpeedDisplay for TextSink {
        fn show_speed(&self, axis: Axis, text: &str) {
            self.lines.lock().push(format!("{axis}: {text}"));
        }
    }

    #[test]
    fn test_sends_only_on_change() {
        let io = Arc::new(RecordingIo::default());
        let control = SpeedControl::new(io.clone());

        assert!(control.set_slider(Axis::Vertical, 10.2).unwrap().is_some());
        // 取整后相同
        assert!(control.set_slider(Axis::Vertical, 9.8).unwrap().is_none());
        assert!(control.set_slider(Axis::Vertical, 11.0).unwrap().is_some());

        let sent = io.sent.lock().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].id, ComponentId::MotorVerticalLeft);
        assert_eq!(sent[0].mode, Mode::ChangeParameters);
        assert_eq!(sent[0].data, 10);
        assert_eq!(sent[1].data, 11);
    }

    #[test]
    fn test_cache_tracks_derived_speed() {
        let io = Arc::new(RecordingIo::default());
        let sink = Arc::new(TextSink::default());
        let control = SpeedControl::new(io).with_display(sink.clone());

        let pair = control.set_slider(Axis::Horizontal, 100.0).unwrap().unwrap();
        assert_eq!(pair.speed, 40.0);
        assert_eq!(control.current(Axis::Horizontal), pair);
        assert_eq!(sink.lines.lock().as_slice(), ["horizontal: 40 mm/s"]);
    }

    #[test]
    fn test_adaptor_speed_two_decimals() {
        let pair = SliderSpeed::new(Axis::Adaptor, 0).unwrap();
        assert_eq!(pair.speed, 0.5);
        assert_eq!(pair.display_text(Axis::Adaptor), "0.50 turn/s");
    }

    #[test]
    fn test_slider_out_of_range() {
        let control = SpeedControl::new(Arc::new(RecordingIo::default()));
        assert!(control.set_slider(Axis::Adaptor, 51.0).is_err());
        assert!(control.set_slider(Axis::Vertical, -3.0).is_err());
    }

    #[test]
    fn test_slider_for_speed_roundtrip() {
        for axis in Axis::ALL {
            let pair = SliderSpeed::new(axis, 37).unwrap();
            let slider = slider_for_speed(axis, pair.speed).unwrap();
            assert_eq!(SliderSpeed::new(axis, slider).unwrap().speed, pair.speed);
        }
        assert_eq!(slider_for_speed(Axis::Vertical, 1000.0), None);
    }
}
